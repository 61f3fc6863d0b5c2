pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod remote;
pub mod services;
pub mod view;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use filter::{FetchPlan, FilterSelection, ListQuery, PeriodFilter, StatusFilter, TaskOrder};
pub use model::{Priority, Task, TaskDraft};
pub use remote::RemoteClient;
pub use services::{CreateOutcome, LoadOutcome, LoadTicket, TaskEngine};
pub use view::{TaskView, ViewStats};
