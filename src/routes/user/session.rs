use serde_json::json;

use crate::session::{SessionError, SessionStore};

use super::model::{SessionUser, User};

const ID: &str = "id";
const NAME: &str = "name";
const EMAIL: &str = "email";

pub fn set_session_user(session: &dyn SessionStore, user: &User) {
    session.set(ID, json!(user.id));
    session.set(NAME, json!(user.name));
    session.set(EMAIL, json!(user.email));
}

/// Reads back what [`set_session_user`] stored. Any missing or mistyped field is an error.
pub fn session_user(session: &dyn SessionStore) -> Result<SessionUser, SessionError> {
    Ok(SessionUser {
        id: session.get_as(ID)?,
        name: session.get_as(NAME)?,
        email: session.get_as(EMAIL)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Provider;
    use crate::session::providers::memory::MemoryProvider;

    fn user() -> User {
        User {
            id: 100000,
            name: "abc".into(),
            email: "abc@adb.abc".into(),
            password_hash: "hash".into(),
        }
    }

    #[test]
    fn stored_user_reads_back() {
        let provider = MemoryProvider::new();
        let session = provider.init("s");
        set_session_user(session.as_ref(), &user());

        let read = session_user(session.as_ref()).unwrap();
        assert_eq!(read, SessionUser::from(&user()));
        assert_eq!(session.get("password_hash"), None);
    }

    #[test]
    fn missing_field_is_reported() {
        let provider = MemoryProvider::new();
        let session = provider.init("s");
        set_session_user(session.as_ref(), &user());
        session.delete(EMAIL);

        let err = session_user(session.as_ref()).unwrap_err();
        assert!(matches!(err, SessionError::MissingField(key) if key == EMAIL));
    }

    #[test]
    fn mistyped_field_is_reported() {
        let provider = MemoryProvider::new();
        let session = provider.init("s");
        set_session_user(session.as_ref(), &user());
        session.set(ID, json!("not a number"));

        let err = session_user(session.as_ref()).unwrap_err();
        assert!(matches!(err, SessionError::FieldType { key, .. } if key == ID));
    }
}
