use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What happens to the rest of the queue once a job has failed.
///
/// - `RetryThenNext`: retry up to the job's retry limit, then move on.
/// - `SkipNext`: same retry rule as `RetryThenNext`; accepted as its own
///   value since existing job files name it.
/// - `StopQueue`: the first failure halts the whole queue, regardless of the
///   configured retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    #[default]
    RetryThenNext,
    SkipNext,
    StopQueue,
}

impl FromStr for FailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "retry_then_next" => Ok(FailPolicy::RetryThenNext),
            "skip_next" => Ok(FailPolicy::SkipNext),
            "stop_queue" => Ok(FailPolicy::StopQueue),
            other => Err(format!(
                "invalid fail_policy: {other} (expected \"retry_then_next\", \"skip_next\" or \"stop_queue\")"
            )),
        }
    }
}

impl fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailPolicy::RetryThenNext => "retry_then_next",
            FailPolicy::SkipNext => "skip_next",
            FailPolicy::StopQueue => "stop_queue",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_names_leniently() {
        assert_eq!("stop_queue".parse::<FailPolicy>(), Ok(FailPolicy::StopQueue));
        assert_eq!(" Skip-Next ".parse::<FailPolicy>(), Ok(FailPolicy::SkipNext));
        assert!("sometimes".parse::<FailPolicy>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for policy in [FailPolicy::RetryThenNext, FailPolicy::SkipNext, FailPolicy::StopQueue] {
            assert_eq!(policy.to_string().parse::<FailPolicy>(), Ok(policy));
        }
    }
}
