pub mod add;
pub mod bulk;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod export;
pub mod filters;
pub mod init;
pub mod list;
pub mod session;
pub mod show;
pub mod stats;
pub mod sync;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use grievance_core::auth::{Auth, GoTrueClient};
use grievance_core::config::{self, Config};
use grievance_core::store::{FileStore, HttpSheet, KeyValueStore, RemoteSheet, Storage, remote};
use grievance_core::{ErrorCode, Tracker};

use crate::output::{CliError, OutputMode, render_error, resolve_output_mode};

/// Everything a command needs: where data lives, the parsed config, and how
/// to print.
pub struct AppContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub output: OutputMode,
}

impl AppContext {
    pub fn load(
        data_dir_flag: Option<&Path>,
        format_flag: Option<OutputMode>,
        json_flag: bool,
    ) -> Result<Self> {
        let data_dir = config::resolve_data_dir(data_dir_flag)?;
        let config = match config::load_config(&data_dir) {
            Ok(config) => config,
            Err(err) => {
                let mode = resolve_output_mode(format_flag, json_flag, None);
                let code = ErrorCode::ConfigParseError;
                render_error(
                    mode,
                    &CliError::with_details(
                        format!("{err:#}"),
                        code.hint().unwrap_or_else(|| code.message()),
                        code.code(),
                    ),
                )?;
                return Err(err);
            }
        };
        let output = resolve_output_mode(format_flag, json_flag, config.ui.output.as_deref());
        tracing::debug!(data_dir = %data_dir.display(), ?output, "context loaded");
        Ok(Self {
            data_dir,
            config,
            output,
        })
    }

    /// Wire the cache, remote mirror and identity client together and
    /// restore any saved session. Nothing is fetched yet.
    pub fn tracker(&self) -> Result<Tracker> {
        let cache: Rc<dyn KeyValueStore> = Rc::new(FileStore::new(&self.data_dir));

        let sheets = &self.config.sheets;
        let remote: Option<Box<dyn RemoteSheet>> = if remote::is_configured(&sheets.script_url) {
            Some(Box::new(HttpSheet::new(&sheets.script_url, sheets.timeout())))
        } else {
            tracing::debug!("remote sheet not configured; running offline");
            None
        };
        let storage = Storage::new(cache.clone(), remote, self.config.storage.clone());

        let auth_cfg = &self.config.auth;
        let identity = GoTrueClient::new(&auth_cfg.url, &auth_cfg.api_key, sheets.timeout());
        let mut auth = Auth::new(
            cache,
            Box::new(identity),
            auth_cfg.role_table(),
            &self.config.storage.session,
        );
        auth.restore();

        Ok(Tracker::new(storage, auth, self.config.ui.first_weekday()?))
    }

    /// Tracker with the collection already loaded.
    pub fn loaded_tracker(&self) -> Result<Tracker> {
        let mut tracker = self.tracker()?;
        tracker.load();
        Ok(tracker)
    }
}
