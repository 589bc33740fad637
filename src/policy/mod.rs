pub mod modes;
pub mod quota;

pub use modes::{
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, Mode, ModeConfig, ModeRegistry, ModeSpec,
    UnknownMode,
};
pub use quota::{AdminList, DEFAULT_DAILY_LIMIT, QuotaDecision, QuotaPolicy, check_and_consume_quota};
