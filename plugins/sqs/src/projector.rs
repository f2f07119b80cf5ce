//! Projection of directory entries into the JSON documents published to SQS.
//!
//! The document is a flat object: `dn` first, then one field per attribute in
//! entry order, keyed by the attribute's base name. Single-valued attributes
//! become strings and multi-valued attributes become arrays of strings. Values
//! are never coerced, so numeric or boolean directory values stay strings.

use serde::ser::{Serialize, SerializeMap, Serializer};
use sync_destination_protocol::{DestinationError, DestinationResult, DirectoryEntry};

/// A directory entry checked to be projectable.
///
/// Serializing it streams fields straight to the serializer, so attributes
/// sharing a base name (`cn` and `cn;lang-fr`) are both emitted in order.
#[derive(Debug, Clone, Copy)]
pub struct EntryDocument<'a> {
    entry: &'a DirectoryEntry,
}

impl<'a> EntryDocument<'a> {
    /// # Errors
    ///
    /// Returns [`DestinationError::Projection`] if any attribute has no values.
    pub fn new(entry: &'a DirectoryEntry) -> DestinationResult<Self> {
        if let Some(empty) = entry
            .attributes
            .iter()
            .find(|attribute| attribute.values.is_empty())
        {
            return Err(DestinationError::Projection {
                dn: entry.dn.clone(),
                attribute: empty.name.clone(),
            });
        }

        Ok(Self { entry })
    }
}

impl Serialize for EntryDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entry.attributes.len() + 1))?;
        map.serialize_entry("dn", &self.entry.dn)?;

        for attribute in &self.entry.attributes {
            match attribute.values.as_slice() {
                [value] => map.serialize_entry(attribute.base_name(), value)?,
                values => map.serialize_entry(attribute.base_name(), values)?,
            }
        }

        map.end()
    }
}

/// Project `entry` into its JSON document.
///
/// A missing entry yields `Ok(None)`: there is nothing to publish, which is
/// different from publishing an empty object.
///
/// # Errors
///
/// Returns [`DestinationError::Projection`] if an attribute has no values.
pub fn project(entry: Option<&DirectoryEntry>) -> DestinationResult<Option<String>> {
    let Some(entry) = entry else {
        return Ok(None);
    };

    let document = EntryDocument::new(entry)?;
    Ok(Some(serde_json::to_string(&document)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sync_destination_protocol::Attribute;

    fn jdoe() -> DirectoryEntry {
        DirectoryEntry::new("uid=jdoe,ou=people,dc=example,dc=com")
    }

    #[test]
    fn single_valued_attribute_becomes_string() {
        let entry = jdoe().with_attribute("cn", ["John Doe"]);

        assert_eq!(
            project(Some(&entry)).unwrap().as_deref(),
            Some(r#"{"dn":"uid=jdoe,ou=people,dc=example,dc=com","cn":"John Doe"}"#)
        );
    }

    #[test]
    fn multi_valued_attribute_becomes_array_in_order() {
        let entry = jdoe().with_attribute("mail", ["jdoe@example.com", "john.doe@example.com"]);

        assert_eq!(
            project(Some(&entry)).unwrap().as_deref(),
            Some(
                r#"{"dn":"uid=jdoe,ou=people,dc=example,dc=com","mail":["jdoe@example.com","john.doe@example.com"]}"#
            )
        );
    }

    #[test]
    fn missing_entry_projects_to_no_document() {
        assert_eq!(project(None).unwrap(), None);
    }

    #[test]
    fn entry_without_attributes_still_has_dn() {
        let entry = jdoe();

        assert_eq!(
            project(Some(&entry)).unwrap().as_deref(),
            Some(r#"{"dn":"uid=jdoe,ou=people,dc=example,dc=com"}"#)
        );
    }

    #[test]
    fn attributes_keep_entry_order_after_dn() {
        let entry = jdoe()
            .with_attribute("sn", ["Doe"])
            .with_attribute("objectClass", ["top", "person", "inetOrgPerson"])
            .with_attribute("cn", ["John Doe"]);

        assert_eq!(
            project(Some(&entry)).unwrap().as_deref(),
            Some(
                r#"{"dn":"uid=jdoe,ou=people,dc=example,dc=com","sn":"Doe","objectClass":["top","person","inetOrgPerson"],"cn":"John Doe"}"#
            )
        );
    }

    #[test]
    fn keys_use_base_name_and_keep_duplicates() {
        let entry = jdoe()
            .with_attribute("cn", ["John Doe"])
            .with_attribute("cn;lang-fr", ["Jean Doe"])
            .with_attribute("userCertificate;binary", ["MIIB"]);

        assert_eq!(
            project(Some(&entry)).unwrap().as_deref(),
            Some(
                r#"{"dn":"uid=jdoe,ou=people,dc=example,dc=com","cn":"John Doe","cn":"Jean Doe","userCertificate":"MIIB"}"#
            )
        );
    }

    #[test]
    fn values_are_never_coerced() {
        let entry = jdoe()
            .with_attribute("uidNumber", ["1001"])
            .with_attribute("accountDisabled", ["false"]);

        let document = project(Some(&entry)).unwrap().unwrap();

        assert!(document.contains(r#""uidNumber":"1001""#));
        assert!(document.contains(r#""accountDisabled":"false""#));
    }

    #[test]
    fn strings_use_standard_json_escaping() {
        let entry = DirectoryEntry::new(r#"cn=Doe\, "Johnny",dc=example,dc=com"#)
            .with_attribute("description", ["line one\nline two"]);

        let document = project(Some(&entry)).unwrap().unwrap();

        assert_eq!(
            document,
            r#"{"dn":"cn=Doe\\, \"Johnny\",dc=example,dc=com","description":"line one\nline two"}"#
        );
        let parsed: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(parsed["dn"], r#"cn=Doe\, "Johnny",dc=example,dc=com"#);
    }

    #[test]
    fn attribute_without_values_fails_loudly() {
        let mut entry = jdoe().with_attribute("cn", ["John Doe"]);
        entry.attributes.push(Attribute::new("mail", Vec::<String>::new()));

        let error = project(Some(&entry)).unwrap_err();

        assert!(matches!(
            error,
            DestinationError::Projection { ref attribute, .. } if attribute == "mail"
        ));
        assert!(!error.is_retryable());
    }
}
