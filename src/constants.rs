//! # Constants
//!
//! Shared constants used throughout the synthesizer.
//!
//! Network and teardown values are defaults that can be overridden via
//! configuration. Database sizing and engine policy are fixed for this stack.

/// Default stack name (the deployment unit submitted to CloudFormation)
pub const DEFAULT_STACK_NAME: &str = "BookstoreStack";

/// Container image served by the load-balanced service
pub const CONTAINER_IMAGE: &str = "amazon/amazon-ecs-sample";

/// Name of the container inside the service's task definition
pub const CONTAINER_NAME: &str = "web";

/// Port the container and the load balancer listen on
pub const CONTAINER_PORT: u16 = 80;

/// Fargate task CPU units
pub const TASK_CPU: u32 = 256;

/// Fargate task memory (MiB)
pub const TASK_MEMORY_MIB: u32 = 512;

/// Number of service tasks kept running
pub const SERVICE_DESIRED_COUNT: u32 = 1;

/// VPC address range
pub const VPC_CIDR: &str = "10.0.0.0/16";

/// Prefix length of the VPC address range
pub const VPC_PREFIX_LEN: u8 = 16;

/// Default number of availability zones the network spans
pub const DEFAULT_MAX_AZS: u8 = 2;

/// Upper bound on availability zones (regions rarely expose more)
pub const MAX_SUPPORTED_AZS: u8 = 6;

/// Default subnet prefix length
pub const DEFAULT_SUBNET_CIDR_MASK: u8 = 24;

/// Smallest subnet CloudFormation accepts for a VPC subnet is /28
pub const MAX_SUBNET_CIDR_MASK: u8 = 28;

/// Database engine
pub const DB_ENGINE: &str = "mysql";

/// Database engine version
pub const DB_ENGINE_VERSION: &str = "8.0";

/// Database instance class
pub const DB_INSTANCE_CLASS: &str = "db.t2.micro";

/// MySQL listener port
pub const DB_PORT: u16 = 3306;

/// Initial allocated storage (GiB)
pub const DB_ALLOCATED_STORAGE_GIB: u32 = 20;

/// Storage auto-scaling ceiling (GiB)
pub const DB_MAX_ALLOCATED_STORAGE_GIB: u32 = 30;

/// Automated backup retention (days)
pub const DB_BACKUP_RETENTION_DAYS: u32 = 7;

/// Enhanced monitoring sampling interval (seconds)
pub const DB_MONITORING_INTERVAL_SECS: u32 = 60;

/// Suffix appended to the database name to form the credentials secret name
pub const CREDENTIALS_SECRET_SUFFIX: &str = "Credentials";

/// JSON key under which the generated password is stored in the secret
pub const PASSWORD_KEY: &str = "password";

/// JSON key under which the username is stored in the secret
pub const USERNAME_KEY: &str = "username";

/// Description of the database security group
pub const DB_SECURITY_GROUP_DESCRIPTION: &str = "Security group for Bookstore Database";

/// Description of the database ingress rule
pub const DB_INGRESS_DESCRIPTION: &str = "Allow MySQL access from Fargate service";

/// Environment variable names injected into the service container
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";

/// Dotenv file picked up from the working directory when none is given explicitly
pub const DEFAULT_DOTENV_FILE: &str = ".env";

/// Number of hex digits of the path hash appended to logical IDs
pub const LOGICAL_ID_HASH_LEN: usize = 8;

/// CloudFormation template format version
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
