//! Text rendering of the HAProxy and SPOE configuration documents.
//!
//! The main document is a fixed skeleton with three holes: the management
//! socket path, the merged `global`/`defaults` directives, and the Data Plane
//! API user. Directives are written one per line, keywords in sorted order and
//! argument lines in sequence order.
//!
//! The SPOE document is constant.

use std::fmt::Write as _;
use std::path::Path;

use crate::credentials::{Credentials, DATAPLANE_USERLIST};
use crate::params::{DEFAULTS, Directives, GLOBAL, ParameterSet};

/// Fixed compression algorithm.
pub const COMPRESSION_ALGO: &str = "gzip";

/// Content types compressed by default.
pub const COMPRESSION_TYPES: &[&str] = &[
    "text/css",
    "text/html",
    "text/javascript",
    "application/javascript",
    "text/plain",
    "text/xml",
    "application/json",
];

/// SPOE agent configuration; identical for every workspace.
pub const SPOE_CONF: &str = "
[intentions]

spoe-agent intentions-agent
\tmessages check-intentions

\toption var-prefix connect

\ttimeout hello      3000ms
\ttimeout idle       3000s
\ttimeout processing 3000ms

\tuse-backend spoe_back

spoe-message check-intentions
\targs ip=src cert=ssl_c_der
\tevent on-frontend-tcp-request

";

/// A directive that cannot be expressed in the line-oriented skeleton.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Keyword is empty or contains whitespace.
    #[error("invalid directive keyword '{keyword}' in section '{section}'")]
    InvalidKeyword { section: String, keyword: String },

    /// Argument line contains a line break and would inject directives.
    #[error("argument of '{keyword}' in section '{section}' contains a line break")]
    MultilineArgument { section: String, keyword: String },

    /// Writing into the output buffer failed.
    #[error("formatting error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Render the main HAProxy document.
///
/// `params` should already be merged with the built-in defaults. Groups
/// other than `global` and `defaults` are not part of the skeleton and are
/// ignored.
///
/// # Errors
///
/// Returns [`TemplateError`] if a directive cannot be placed on a single line.
pub fn render_haproxy_conf(
    stats_sock: &Path,
    params: &ParameterSet,
    credentials: &Credentials,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(1024);

    out.push('\n');
    out.push_str("global\n");
    out.push_str("\tmaster-worker\n");
    writeln!(
        out,
        "\tstats socket {} mode 600 level admin expose-fd listeners",
        stats_sock.display()
    )?;
    write_directives(&mut out, GLOBAL, params.group(GLOBAL))?;

    out.push('\n');
    out.push_str("defaults\n");
    write_directives(&mut out, DEFAULTS, params.group(DEFAULTS))?;
    writeln!(out, "\tcompression algo {COMPRESSION_ALGO}")?;
    writeln!(out, "\tcompression type {}", COMPRESSION_TYPES.join(" "))?;

    out.push('\n');
    writeln!(out, "userlist {DATAPLANE_USERLIST}")?;
    writeln!(
        out,
        "\tuser {} insecure-password {}",
        credentials.username(),
        credentials.password()
    )?;
    out.push('\n');

    Ok(out)
}

fn write_directives(
    out: &mut String,
    section: &str,
    directives: Option<&Directives>,
) -> Result<(), TemplateError> {
    let Some(directives) = directives else {
        return Ok(());
    };

    for (keyword, lines) in directives {
        if keyword.is_empty() || keyword.chars().any(char::is_whitespace) {
            return Err(TemplateError::InvalidKeyword {
                section: section.to_string(),
                keyword: keyword.clone(),
            });
        }
        for line in lines {
            if line.contains(['\n', '\r']) {
                return Err(TemplateError::MultilineArgument {
                    section: section.to_string(),
                    keyword: keyword.clone(),
                });
            }
            if line.is_empty() {
                writeln!(out, "\t{keyword}")?;
            } else {
                writeln!(out, "\t{keyword} {line}")?;
            }
        }
    }
    Ok(())
}
