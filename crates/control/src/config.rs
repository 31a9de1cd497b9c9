/// Process configuration (C7), grounded on `agent::main`'s `clap::Parser`
/// struct: every field is overridable by environment variable via
/// `#[clap(env = "...")]`, matching the teacher's convention of treating the
/// CLI and the environment as the same configuration surface.
#[derive(clap::Parser, Debug)]
#[command(name = "control", about = "Control plane core for the edge proxy fabric")]
pub struct Args {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "CONTROL_BIND_ADDR", default_value = "0.0.0.0:443")]
    pub bind_addr: std::net::SocketAddr,

    #[arg(long, env = "CONTROL_BUCKET")]
    pub bucket: String,

    #[arg(long, env = "CONTROL_LOCK_TABLE")]
    pub lock_table: String,

    #[arg(long, env = "CONTROL_REGISTER_TOKEN")]
    pub register_token: String,

    #[arg(long, env = "CONTROL_KMS_KEY_ID")]
    pub kms_key_id: Option<String>,

    /// Accepted for configuration-surface compatibility; the ASN lookup
    /// itself is out of scope (see Non-goals).
    #[arg(long, env = "CONTROL_ASN_DB_PATH")]
    pub asn_db_path: Option<String>,

    #[arg(long, env = "CONTROL_TLS_CERT_PATH")]
    pub tls_cert_path: std::path::PathBuf,

    #[arg(long, env = "CONTROL_TLS_KEY_PATH")]
    pub tls_key_path: std::path::PathBuf,

    #[arg(long, env = "CONTROL_TOKEN_KEY_PATH", default_value = "/control/keys")]
    pub token_key_path: String,

    #[arg(long, env = "CONTROL_ACTIVITY_RETENTION", default_value = "5h")]
    #[arg(value_parser = humantime::parse_duration)]
    pub activity_retention: std::time::Duration,

    #[arg(long, env = "CONTROL_PRUNER_PERIOD", default_value = "10m")]
    #[arg(value_parser = humantime::parse_duration)]
    pub pruner_period: std::time::Duration,
}
