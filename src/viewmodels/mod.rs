pub mod feedback_viewmodel;
pub mod material_viewmodel;
pub mod records_viewmodel;
pub mod scan_viewmodel;
pub mod signin_viewmodel;
pub mod statistics_viewmodel;

pub use feedback_viewmodel::FeedbackViewModel;
pub use material_viewmodel::{LookupVerdict, MaterialViewModel};
pub use records_viewmodel::RecordsViewModel;
pub use signin_viewmodel::SignInViewModel;
