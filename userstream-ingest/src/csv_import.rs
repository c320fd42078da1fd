//! User CSV parsing for uploads and the `publish` command
//!
//! Expected header: `id,first_name,last_name,email_address,created_at,
//! deleted_at,merged_at,parent_user_id`. Only `id` is required; column
//! order is free. Empty `deleted_at`/`merged_at` mean never happened and
//! an empty `parent_user_id` means no parent.

use serde::Deserialize;

use userstream_core::{
    models::{User, UserId, NOT_SET},
    Error, Result,
};

#[derive(Debug, Deserialize)]
struct UserRow {
    id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email_address: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    deleted_at: String,
    #[serde(default)]
    merged_at: String,
    #[serde(default)]
    parent_user_id: String,
}

impl UserRow {
    fn into_user(self) -> std::result::Result<User, String> {
        let id: UserId = parse_int("id", &self.id)?.ok_or("id is empty")?;

        Ok(User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email_address: self.email_address,
            created_at: parse_int("created_at", &self.created_at)?.unwrap_or(0),
            deleted_at: parse_int("deleted_at", &self.deleted_at)?.unwrap_or(NOT_SET),
            merged_at: parse_int("merged_at", &self.merged_at)?.unwrap_or(NOT_SET),
            parent_user_id: parse_int("parent_user_id", &self.parent_user_id)?,
        })
    }
}

fn parse_int(column: &str, value: &str) -> std::result::Result<Option<i64>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("{column} is not an integer: {value:?}"))
}

/// Parse a CSV document into users, in file order.
///
/// Fails on the first bad row with [`Error::InvalidInput`] naming its line.
pub fn parse_users_csv(data: &[u8]) -> Result<Vec<User>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| Error::InvalidInput(format!("Invalid CSV header: {e}")))?
        .clone();
    if !headers.iter().any(|h| h == "id") {
        return Err(Error::InvalidInput("CSV header has no id column".to_string()));
    }

    let mut users = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::InvalidInput(format!("Malformed CSV: {e}")))?;
        let line = record.position().map_or(0, csv::Position::line);

        let user = record
            .deserialize::<UserRow>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(UserRow::into_user)
            .map_err(|e| Error::InvalidInput(format!("CSV line {line}: {e}")))?;
        users.push(user);
    }

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "id,first_name,last_name,email_address,created_at,deleted_at,merged_at,parent_user_id\n";

    #[test]
    fn test_parse_full_rows() {
        let data = format!(
            "{HEADER}1,Ada,Lovelace,ada@example.com,1700000000000,-1,-1,\n\
             2,Grace,Hopper,grace@example.com,1700000000001,1700000009999,-1,1\n"
        );

        let users = parse_users_csv(data.as_bytes()).unwrap();
        assert_eq!(users.len(), 2);

        assert_eq!(users[0].id, 1);
        assert_eq!(users[0].last_name, "Lovelace");
        assert_eq!(users[0].created_at, 1_700_000_000_000);
        assert!(!users[0].is_deleted());
        assert_eq!(users[0].parent_user_id, None);

        assert_eq!(users[1].email_address, "grace@example.com");
        assert!(users[1].is_deleted());
        assert!(!users[1].is_merged());
        assert_eq!(users[1].parent_user_id, Some(1));
    }

    #[test]
    fn test_empty_and_missing_columns_use_unset_values() {
        let data = "parent_user_id,id,first_name\n ,7, Alan \n3,8,\n";

        let users = parse_users_csv(data.as_bytes()).unwrap();
        assert_eq!(users[0].id, 7);
        assert_eq!(users[0].first_name, "Alan");
        assert_eq!(users[0].parent_user_id, None);
        assert_eq!(users[0].deleted_at, NOT_SET);
        assert_eq!(users[0].merged_at, NOT_SET);
        assert_eq!(users[0].created_at, 0);
        assert_eq!(users[1].parent_user_id, Some(3));
    }

    #[test]
    fn test_bad_row_names_its_line() {
        let data = format!("{HEADER}1,Ada,,,,,,\n2,Grace,,,yesterday,,,\n");

        let err = parse_users_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let message = err.to_string();
        assert!(message.contains("line 3"), "{message}");
        assert!(message.contains("created_at"), "{message}");
    }

    #[test]
    fn test_rejects_missing_id() {
        let data = format!("{HEADER},Ada,,,,,,\n");
        assert!(parse_users_csv(data.as_bytes()).is_err());

        assert!(parse_users_csv(b"first_name\nAda\n").is_err());
    }

    #[test]
    fn test_rejects_ragged_row() {
        let data = format!("{HEADER}1,Ada\n");
        assert!(parse_users_csv(data.as_bytes()).is_err());
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse_users_csv(HEADER.as_bytes()).unwrap().is_empty());
    }
}
