//! # Credential Object
//!
//! A generated username/password secret scoped to the database.
//!
//! The secret store generates the password at deploy time from
//! `SecretStringTemplate` + `GenerateStringKey`; the synthesizer never sees
//! it. Consumers reach the values through dynamic references
//! (`{{resolve:secretsmanager:...}}`) or, for containers, through a
//! `ValueFrom` ARN suffix.

use super::common::kinds;
use super::Declaration;
use crate::config::{RemovalPolicy, StackConfig};
use crate::constants::{PASSWORD_KEY, USERNAME_KEY};
use crate::template::{LogicalId, Resource, Scope, SynthError, Template, Value};
use serde::Serialize;
use tracing::debug;

/// Password generation rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub exclude_punctuation: bool,
    pub include_space: bool,
    pub generate_string_key: &'static str,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            exclude_punctuation: true,
            include_space: false,
            generate_string_key: PASSWORD_KEY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialObject {
    pub secret: LogicalId,
    pub attachment: LogicalId,
    /// Physical name, `<databaseName>Credentials`
    pub secret_name: String,
    pub username: String,
    pub password_policy: PasswordPolicy,
    /// Database instance the secret is attached to, once declared
    target: Option<LogicalId>,
    removal_policy: &'static str,
}

impl CredentialObject {
    pub fn new(scope: &Scope, config: &StackConfig) -> Self {
        // Secrets cannot be snapshotted; a snapshot teardown deletes the secret
        let removal_policy = match config.teardown.removal_policy {
            RemovalPolicy::Retain => RemovalPolicy::Retain.as_cfn_policy(),
            RemovalPolicy::Destroy | RemovalPolicy::Snapshot => {
                RemovalPolicy::Destroy.as_cfn_policy()
            }
        };
        let secret_name = config.credentials_secret_name();
        debug!(secret_name = %secret_name, "Declared credential object");

        Self {
            secret: scope.logical_id(),
            attachment: scope.id("Attachment"),
            secret_name,
            username: config.database_username.clone(),
            password_policy: PasswordPolicy::default(),
            target: None,
            removal_policy,
        }
    }

    /// Bind the secret to a database instance
    pub fn attach_to(&mut self, instance: &LogicalId) {
        self.target = Some(instance.clone());
    }

    pub fn attached_to(&self) -> Option<&LogicalId> {
        self.target.as_ref()
    }

    /// `SecretStringTemplate`: the JSON object the password key is added to
    pub fn secret_template(&self) -> String {
        let mut object = serde_json::Map::new();
        object.insert(
            USERNAME_KEY.to_string(),
            serde_json::Value::String(self.username.clone()),
        );
        serde_json::Value::Object(object).to_string()
    }

    pub fn secret_arn(&self) -> Value {
        Value::reference(&self.secret)
    }

    /// Dynamic reference to the stored username
    pub fn resolve_username(&self) -> Value {
        self.resolve(USERNAME_KEY)
    }

    /// Dynamic reference to the generated password
    pub fn resolve_password(&self) -> Value {
        self.resolve(self.password_policy.generate_string_key)
    }

    /// `<secret-arn>:password::`, the container `ValueFrom` of the password
    pub fn password_value_from(&self) -> Value {
        Value::concat(vec![
            self.secret_arn(),
            Value::literal(format!(":{}::", self.password_policy.generate_string_key)),
        ])
    }

    fn resolve(&self, key: &str) -> Value {
        Value::concat(vec![
            Value::literal("{{resolve:secretsmanager:"),
            self.secret_arn(),
            Value::literal(format!(":SecretString:{key}::}}}}")),
        ])
    }
}

impl Declaration for CredentialObject {
    fn emit(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.secret.clone(),
            Resource::new(
                &self.secret,
                kinds::SECRET,
                &SecretProps {
                    name: self.secret_name.clone(),
                    description: format!("Generated credentials for {}", self.secret_name),
                    generate_secret_string: GenerateSecretString {
                        secret_string_template: self.secret_template(),
                        generate_string_key: self.password_policy.generate_string_key,
                        exclude_punctuation: self.password_policy.exclude_punctuation,
                        include_space: self.password_policy.include_space,
                        exclude_characters: "\"@/\\",
                    },
                },
            )?
            .removal_policy(self.removal_policy),
        )?;

        if let Some(target) = &self.target {
            template.add(
                self.attachment.clone(),
                Resource::new(
                    &self.attachment,
                    kinds::SECRET_ATTACHMENT,
                    &AttachmentProps {
                        secret_id: self.secret_arn(),
                        target_id: Value::reference(target),
                        target_type: kinds::DB_INSTANCE,
                    },
                )?,
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GenerateSecretString {
    secret_string_template: String,
    generate_string_key: &'static str,
    exclude_punctuation: bool,
    include_space: bool,
    exclude_characters: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SecretProps {
    name: String,
    description: String,
    generate_secret_string: GenerateSecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttachmentProps {
    secret_id: Value,
    target_id: Value,
    target_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials(config: &StackConfig) -> CredentialObject {
        CredentialObject::new(&Scope::root("Test").child("DBCredentialsSecret"), config)
    }

    #[test]
    fn test_secret_name_and_template() {
        let creds = credentials(&StackConfig::new("shop", "admin"));

        assert_eq!(creds.secret_name, "shopCredentials");
        assert_eq!(creds.secret_template(), r#"{"username":"admin"}"#);
        assert_eq!(creds.password_policy.generate_string_key, "password");
        assert!(creds.password_policy.exclude_punctuation);
        assert!(!creds.password_policy.include_space);
    }

    #[test]
    fn test_generated_secret_shape() {
        let creds = credentials(&StackConfig::new("shop", "admin"));
        let mut template = Template::new("Test");
        creds.emit(&mut template).unwrap();

        let secret = template.resource(&creds.secret).unwrap();
        assert_eq!(secret.property("Name").unwrap(), "shopCredentials");
        let generate = secret.property("GenerateSecretString").unwrap();
        assert_eq!(generate["SecretStringTemplate"], r#"{"username":"admin"}"#);
        assert_eq!(generate["GenerateStringKey"], "password");
        assert_eq!(generate["ExcludePunctuation"], true);
        assert_eq!(generate["IncludeSpace"], false);
        assert!(generate.get("SecretString").is_none(), "password must never be supplied");
        assert_eq!(secret.deletion_policy.as_deref(), Some("Delete"));

        // Not attached yet
        assert_eq!(template.count_of_type(kinds::SECRET_ATTACHMENT), 0);
    }

    #[test]
    fn test_attachment_targets_instance() {
        let mut creds = credentials(&StackConfig::new("shop", "admin"));
        let instance = LogicalId::new("BookstoreDatabase");
        creds.attach_to(&instance);

        let mut template = Template::new("Test");
        creds.emit(&mut template).unwrap();

        let attachment = template.resource(&creds.attachment).unwrap();
        assert_eq!(attachment.property("TargetId").unwrap(), &json!({"Ref": "BookstoreDatabase"}));
        assert_eq!(attachment.property("TargetType").unwrap(), "AWS::RDS::DBInstance");
    }

    #[test]
    fn test_dynamic_references() {
        let creds = credentials(&StackConfig::new("shop", "admin"));

        assert_eq!(
            serde_json::to_value(creds.resolve_password()).unwrap(),
            json!({"Fn::Join": ["", [
                "{{resolve:secretsmanager:",
                {"Ref": "DBCredentialsSecret"},
                ":SecretString:password::}}"
            ]]})
        );
        assert_eq!(
            serde_json::to_value(creds.password_value_from()).unwrap(),
            json!({"Fn::Join": ["", [{"Ref": "DBCredentialsSecret"}, ":password::"]]})
        );
    }

    #[test]
    fn test_retained_database_retains_secret() {
        let mut config = StackConfig::new("shop", "admin");
        config.teardown.removal_policy = RemovalPolicy::Retain;
        let creds = credentials(&config);

        let mut template = Template::new("Test");
        creds.emit(&mut template).unwrap();
        assert_eq!(
            template.resource(&creds.secret).unwrap().deletion_policy.as_deref(),
            Some("Retain")
        );
    }
}
