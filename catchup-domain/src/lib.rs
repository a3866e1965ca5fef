mod fields;
mod issue;
mod ordering;
mod period;

pub use fields::{normalize_custom_fields, CustomFields, FieldValue};
pub use issue::{
    Issue, IssueComment, CUSTOM_FIELDS_KEY, RAW_CUSTOM_FIELDS_COPY_KEY, RAW_CUSTOM_FIELDS_KEY,
};
pub use ordering::sort_by_updated_desc;
pub use period::{involvement_query, Period, PeriodError};
