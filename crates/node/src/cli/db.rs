use std::path::PathBuf;

#[derive(Clone, Debug, clap::Args)]
pub struct DbParams {
    /// The path where vigil will store the database. You should probably change it.
    #[clap(env = "VIGIL_BASE_PATH", long, default_value = "/tmp/vigil", value_name = "PATH")]
    pub base_path: PathBuf,
}
