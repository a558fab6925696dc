#![allow(non_upper_case_globals)] // allow MiB name

use crate::Column;
use anyhow::{Context, Result};
use rocksdb::{DBCompressionType, Env, Options};

const MiB: usize = 1024 * 1024;

pub fn rocksdb_global_options() -> Result<Options> {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);

    // Rocksdb logs a lot of per-column info by default, cap the log files.
    options.set_max_log_file_size(10 * MiB);
    options.set_keep_log_file_num(3);
    options.set_log_level(rocksdb::LogLevel::Warn);
    options.set_max_open_files(2048);

    let cores = std::thread::available_parallelism().map(|e| e.get() as i32).unwrap_or(1);
    options.increase_parallelism(cores);
    options.set_max_background_jobs(cores);
    let mut env = Env::new().context("Creating rocksdb env")?;
    env.set_low_priority_background_threads(cores); // compaction
    options.set_env(&env);

    Ok(options)
}

impl Column {
    /// Per column rocksdb options, like memory budget and compaction
    /// profile.
    pub(crate) fn rocksdb_options(&self) -> Options {
        let mut options = Options::default();
        options.set_compression_type(DBCompressionType::Zstd);
        match self {
            Column::Groups | Column::RollbackLedger => {
                options.optimize_universal_style_compaction(128 * MiB);
            }
            _ => {
                options.optimize_universal_style_compaction(32 * MiB);
            }
        }
        options
    }
}
