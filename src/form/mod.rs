pub mod export;
pub mod submission;

pub use export::append_submission_to_csv;
pub use submission::{validate_submission, FormSubmission, WishFormRequest};
