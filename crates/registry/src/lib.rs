//! registry — the public client facade (§3-§4.9): parses an identifier
//! into a wired channel stack and exposes typed get/set/enum operations
//! scoped to a domain.

pub mod error;
mod handle;
mod identifier;

pub use error::RegistryError;
pub use handle::Registry;
pub use registry_core::ValueKind;

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &tempfile::TempDir, domain: &str) -> Registry {
        let id = format!("file://{}", dir.path().display());
        Registry::open(&id, domain).unwrap()
    }

    #[test]
    fn set_then_get_int_through_the_full_stack() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = open(&dir, "cfg");
        reg.set_int("retries", 3).unwrap();
        assert_eq!(reg.get_int("retries").unwrap(), 3);
    }

    #[test]
    fn get_on_absent_key_is_no_such_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = open(&dir, "cfg");
        assert_eq!(reg.get_int("missing"), Err(RegistryError::NoSuchKey));
    }

    #[test]
    fn set_then_get_blob_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = open(&dir, "files");
        reg.set_blob("avatar", &[1, 2, 3, 4]).unwrap();
        assert_eq!(reg.get_blob("avatar").unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn get_value_type_reflects_last_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = open(&dir, "cfg");
        reg.set_string("name", "alice").unwrap();
        assert_eq!(reg.get_value_type("name").unwrap(), ValueKind::String);
    }

    #[test]
    fn enum_keys_matches_glob_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = open(&dir, "enum");
        for key in ["key3", "key1", "key2", "no match"] {
            reg.set_int(key, 0).unwrap();
        }
        assert_eq!(reg.enum_keys("key*").unwrap(), vec!["key1", "key2", "key3"]);
    }

    #[test]
    fn hmac_identifier_round_trips_through_connector_and_mirrored_chain() {
        let dir = tempfile::tempdir().unwrap();
        let id = format!("file://{}|hmac://sharedsecret", dir.path().display());
        let mut reg = Registry::open(&id, "cfg").unwrap();
        reg.set_double("ratio", 0.5).unwrap();
        assert_eq!(reg.get_double("ratio").unwrap(), 0.5);
    }

    #[test]
    fn unknown_identifier_scheme_is_rejected() {
        assert_eq!(
            Registry::open("bogus:///tmp/x", "cfg").unwrap_err(),
            RegistryError::UnknownIdentifier
        );
    }
}
