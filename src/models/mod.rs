mod submission;

pub use submission::{
    is_placeholder, InsertOutcome, NewSubmission, Submission, SubmissionStatus, SubmitReceipt,
    SubmitStatus, ERROR_PREFIX, PLACEHOLDER_PREFIX,
};
