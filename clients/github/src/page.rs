use log::warn;
use repo_insights::api::{Error, PAGE_SIZE};
use reqwest::Response;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One response slice of a paginated listing.
#[derive(Debug)]
pub struct Page<T> {
    /// 1-based
    pub number: u32,
    pub records: Vec<T>,
}

impl<T> Page<T> {
    /// Only a full page can be followed by another one.
    pub fn may_have_more(&self) -> bool {
        self.records.len() == PAGE_SIZE as usize
    }
}

/// Result of a single page request, switched on by the pagination loop.
#[derive(Debug)]
pub enum PageOutcome<T> {
    Success(Page<T>),
    /// 204, an empty list or a body that is not a list.
    EmptyTerminal,
    /// 409, the repository is empty or was moved.
    ConflictTerminal,
    TransientFailure(Error),
}

impl<T: DeserializeOwned> PageOutcome<T> {
    pub(crate) async fn from_response(number: u32, response: Response) -> Self {
        let status = response.status();
        match status {
            StatusCode::NO_CONTENT => PageOutcome::EmptyTerminal,
            StatusCode::CONFLICT => PageOutcome::ConflictTerminal,
            status if status.is_success() => match response.bytes().await {
                Ok(body) => Self::from_body(number, &body),
                Err(err) => PageOutcome::TransientFailure(err.into()),
            },
            status => PageOutcome::TransientFailure(Error::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            }),
        }
    }

    pub(crate) fn from_body(number: u32, body: &[u8]) -> Self {
        if body.is_empty() {
            return PageOutcome::EmptyTerminal;
        }
        let records = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Array(records)) if records.is_empty() => return PageOutcome::EmptyTerminal,
            Ok(Value::Array(records)) => records,
            Ok(other) => {
                warn!("Page {} is not a list but {}", number, json_kind(&other));
                return PageOutcome::EmptyTerminal;
            }
            Err(err) => {
                warn!("Page {} is not JSON: {}", number, err);
                return PageOutcome::EmptyTerminal;
            }
        };
        match records
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, serde_json::Error>>()
        {
            Ok(records) => PageOutcome::Success(Page { number, records }),
            Err(err) => PageOutcome::TransientFailure(err.into()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Record {
        id: u32,
    }

    #[test]
    fn list_body_is_a_page_test() {
        match PageOutcome::<Record>::from_body(2, br#"[{"id": 1}, {"id": 2}]"#) {
            PageOutcome::Success(page) => {
                assert_eq!(page.number, 2);
                assert_eq!(page.records, vec![Record { id: 1 }, Record { id: 2 }]);
                assert!(!page.may_have_more());
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn full_page_may_have_more_test() {
        let page = Page {
            number: 1,
            records: vec![0u8; PAGE_SIZE as usize],
        };
        assert!(page.may_have_more());
    }

    #[test]
    fn empty_or_non_list_body_terminates_test() {
        let bodies: [&[u8]; 4] = [b"", b"[]", br#"{"message": "Not a listing"}"#, b"plain text"];
        for body in bodies {
            assert!(
                matches!(PageOutcome::<Record>::from_body(1, body), PageOutcome::EmptyTerminal),
                "Body {:?} should end pagination",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn malformed_record_is_a_failure_test() {
        let outcome = PageOutcome::<Record>::from_body(1, br#"[{"id": "one"}]"#);
        assert!(matches!(outcome, PageOutcome::TransientFailure(Error::Payload(_))));
    }
}
