//! Provider failure classification.
//!
//! Maps a [`ProviderError`] onto the gateway's [`ErrorKind`] taxonomy.
//! Provider error codes are looked up in [`CODE_TABLE`]; anything without a
//! listed code falls back on the fault class:
//!
//! | Fault                               | Kind                  |
//! |-------------------------------------|-----------------------|
//! | `Rejected`                          | `InvalidParam`        |
//! | `Construction`/`Dispatch`/`Timeout` | `Client`              |
//! | `Response`                          | `Service`             |
//! | `Service` with status >= 500        | `Service`             |
//! | `Service` otherwise                 | `DataObject`          |
//! | `Body`                              | `DataObject`          |

use crate::errors::{DataObjectError, ErrorKind};
use crate::storage::backend::{Fault, ProviderError};

/// Provider error code -> taxonomy kind.
pub const CODE_TABLE: &[(&str, ErrorKind)] = &[
    ("NoSuchKey", ErrorKind::KeyNotFound),
    ("NotFound", ErrorKind::KeyNotFound),
    ("NoSuchBucket", ErrorKind::DataObjectNotFound),
    ("AccessDenied", ErrorKind::AccessDenied),
    ("AllAccessDisabled", ErrorKind::AccessDenied),
    ("InvalidObjectState", ErrorKind::AccessDenied),
    ("InternalError", ErrorKind::Service),
    ("ServiceUnavailable", ErrorKind::Service),
    ("SlowDown", ErrorKind::Service),
];

/// Look up a provider code in [`CODE_TABLE`].
pub fn kind_for_code(code: &str) -> Option<ErrorKind> {
    CODE_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, kind)| *kind)
}

/// Kind for a provider failure.
pub fn kind_of(err: &ProviderError) -> ErrorKind {
    match err.fault {
        Fault::Rejected => ErrorKind::InvalidParam,
        Fault::Construction | Fault::Dispatch | Fault::Timeout => ErrorKind::Client,
        Fault::Response => ErrorKind::Service,
        Fault::Body => ErrorKind::DataObject,
        Fault::Service { status } => match err.code().and_then(kind_for_code) {
            Some(kind) => kind,
            None if status >= 500 => ErrorKind::Service,
            None => ErrorKind::DataObject,
        },
    }
}

/// Convert a provider failure into the gateway error for an operation on
/// `key` (`None` for container-level operations).
pub fn classify(err: ProviderError, key: Option<&str>) -> DataObjectError {
    let kind = kind_of(&err);
    let message = match err.code() {
        Some(code) => format!("{} ({code}): {}", err.operation, err.message),
        None => format!("{}: {}", err.operation, err.message),
    };
    DataObjectError::of_kind(kind, key, message)
}

/// True when the failure means "no object under this key".  Used by
/// `exists` to fold absence into `false`.
pub fn is_absent_key(err: &ProviderError) -> bool {
    kind_of(err) == ErrorKind::KeyNotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(status: u16, code: &str) -> ProviderError {
        ProviderError::service("get_object", status, code, "boom")
    }

    #[test]
    fn test_code_table_lookup() {
        assert_eq!(kind_for_code("NoSuchKey"), Some(ErrorKind::KeyNotFound));
        assert_eq!(kind_for_code("NoSuchBucket"), Some(ErrorKind::DataObjectNotFound));
        assert_eq!(kind_for_code("InvalidObjectState"), Some(ErrorKind::AccessDenied));
        assert_eq!(kind_for_code("BadDigest"), None);
    }

    #[test]
    fn test_no_such_key_becomes_key_not_found() {
        let err = classify(service(404, "NoSuchKey"), Some("photo.jpg"));
        assert_eq!(err, DataObjectError::key_not_found("photo.jpg"));
    }

    #[test]
    fn test_invalid_object_state_is_access_denied() {
        let err = classify(service(403, "InvalidObjectState"), Some("archived"));
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn test_unknown_client_side_code_is_data_object() {
        let err = classify(service(400, "BadDigest"), Some("k"));
        assert_eq!(err.kind(), ErrorKind::DataObject);
    }

    #[test]
    fn test_unknown_server_side_code_is_service() {
        let err = classify(service(503, "SomethingNew"), Some("k"));
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[test]
    fn test_transport_faults_are_client_errors() {
        for fault in [Fault::Construction, Fault::Dispatch, Fault::Timeout] {
            let err = classify(ProviderError::new("put_object", fault, "nope"), Some("k"));
            assert_eq!(err.kind(), ErrorKind::Client, "fault {fault:?}");
        }
    }

    #[test]
    fn test_unreadable_response_is_service_error() {
        let err = classify(
            ProviderError::new("list_objects_v2", Fault::Response, "bad xml"),
            None,
        );
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[test]
    fn test_body_read_failure_is_data_object() {
        let err = classify(
            ProviderError::new("get_object", Fault::Body, "reset by peer"),
            Some("k"),
        );
        assert_eq!(err.kind(), ErrorKind::DataObject);
    }

    #[test]
    fn test_rejected_input_is_invalid_param() {
        let err = classify(
            ProviderError::new("presign_get", Fault::Rejected, "too long"),
            Some("k"),
        );
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
    }

    #[test]
    fn test_message_keeps_operation_and_code() {
        let err = classify(service(409, "OperationAborted"), Some("k"));
        assert_eq!(
            err,
            DataObjectError::DataObject("get_object (OperationAborted): boom".into())
        );
    }

    #[test]
    fn test_is_absent_key() {
        assert!(is_absent_key(&service(404, "NotFound")));
        assert!(is_absent_key(&service(404, "NoSuchKey")));
        assert!(!is_absent_key(&service(404, "NoSuchBucket")));
        assert!(!is_absent_key(&ProviderError::new(
            "head_object",
            Fault::Timeout,
            "slow"
        )));
    }
}
