//! Writing the configuration documents into a workspace.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use tracing::debug;

use crate::credentials::Credentials;
use crate::error::ProvisionError;
use crate::params::ParameterSet;
use crate::render::{SPOE_CONF, render_haproxy_conf};
use crate::workspace::Workspace;

/// Generate credentials and write both documents into `workspace`.
///
/// `params` is rendered as given; merge it with
/// [`ParameterSet::defaults`] first. Existing documents are truncated.
///
/// # Errors
///
/// - [`ProvisionError::Credentials`] if no password could be generated.
/// - [`ProvisionError::Template`] if a directive cannot be rendered.
/// - [`ProvisionError::Materialization`] if either document cannot be
///   opened or written.
pub fn materialize(
    workspace: &Workspace,
    params: &ParameterSet,
) -> Result<Credentials, ProvisionError> {
    let credentials = Credentials::generate()?;

    let haproxy_conf = render_haproxy_conf(workspace.stats_sock(), params, &credentials)?;
    write_private(workspace.haproxy_conf(), &haproxy_conf)?;
    write_private(workspace.spoe_conf(), SPOE_CONF)?;

    debug!(
        workspace = %workspace.base().display(),
        "Configuration documents written"
    );
    Ok(credentials)
}

/// Write `contents` to `path`, truncating it, readable only by the owner.
///
/// The file handle is scoped to this call and closed on every return path.
fn write_private(path: &Path, contents: &str) -> Result<(), ProvisionError> {
    let err = |source| ProvisionError::Materialization {
        path: path.to_path_buf(),
        source,
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(err)?;
    file.write_all(contents.as_bytes()).map_err(err)?;
    file.flush().map_err(err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShutdownCoordinator;
    use crate::params::GLOBAL;

    #[tokio::test]
    async fn test_materialize_writes_both_documents() {
        let tmp = tempfile::tempdir().unwrap();
        let sd = ShutdownCoordinator::new();
        let ws = Workspace::provision(tmp.path(), &sd).unwrap();

        let creds = materialize(&ws, &ParameterSet::defaults()).unwrap();

        let main = std::fs::read_to_string(ws.haproxy_conf()).unwrap();
        assert!(main.contains(&format!(
            "\tstats socket {} mode 600",
            ws.stats_sock().display()
        )));
        assert!(main.contains(&format!(
            "\tuser {} insecure-password {}\n",
            creds.username(),
            creds.password()
        )));
        assert_eq!(std::fs::read_to_string(ws.spoe_conf()).unwrap(), SPOE_CONF);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_materialize_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let sd = ShutdownCoordinator::new();
        let ws = Workspace::provision(tmp.path(), &sd).unwrap();
        materialize(&ws, &ParameterSet::defaults()).unwrap();

        for path in [ws.haproxy_conf(), ws.spoe_conf()] {
            let mode = std::fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
        }
    }

    #[tokio::test]
    async fn test_materialize_truncates_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let sd = ShutdownCoordinator::new();
        let ws = Workspace::provision(tmp.path(), &sd).unwrap();
        std::fs::write(ws.haproxy_conf(), "x".repeat(64 * 1024)).unwrap();

        materialize(&ws, &ParameterSet::new()).unwrap();
        let main = std::fs::read_to_string(ws.haproxy_conf()).unwrap();
        assert!(main.starts_with("\nglobal\n"));
        assert!(!main.contains("xxxx"));
    }

    #[tokio::test]
    async fn test_materialize_write_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let sd = ShutdownCoordinator::new();
        let ws = Workspace::provision(tmp.path(), &sd).unwrap();
        // a directory where the document should go
        std::fs::create_dir(ws.haproxy_conf()).unwrap();

        let err = materialize(&ws, &ParameterSet::defaults()).unwrap_err();
        match err {
            ProvisionError::Materialization { path, .. } => {
                assert_eq!(path, ws.haproxy_conf());
            }
            other => panic!("expected Materialization, got {other:?}"),
        }
        // cleanup obligation still counted
        assert_eq!(sd.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_materialize_template_failure_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let sd = ShutdownCoordinator::new();
        let ws = Workspace::provision(tmp.path(), &sd).unwrap();

        let mut params = ParameterSet::new();
        params.insert(GLOBAL, "maxconn", ["1\r\n"]);
        let err = materialize(&ws, &params).unwrap_err();
        assert!(matches!(err, ProvisionError::Template(_)));
        assert!(!ws.haproxy_conf().exists());
        assert!(!ws.spoe_conf().exists());
    }
}
