pub mod chrome;
pub mod controller;
pub mod driver;
pub mod types;

pub use chrome::ChromeDriver;
pub use controller::{CaptureController, ScrollPlan, StabilizationConfig};
pub use driver::{MockPageDriver, PageDriver};
pub use types::{CaptureError, CaptureResult, OriginCaptureArgs, SuppressionPolicy};
