use log::debug;
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::Command;

use crate::config::ClientSettings;
use crate::error::DumpError;

/// Result of an external program run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit; the code is absent when the process was killed by a signal
    Failed(Option<i32>),
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            ExitOutcome::Success
        } else {
            ExitOutcome::Failed(status.code())
        }
    }
}

/// Exports the result of a query to a CSV file with a header row
#[allow(async_fn_in_trait)]
pub trait QueryClient {
    async fn export(
        &self,
        database: &str,
        query: &str,
        output: &Path,
    ) -> Result<ExitOutcome, DumpError>;
}

/// Compresses `input` into `output`
#[allow(async_fn_in_trait)]
pub trait Compressor {
    async fn compress(
        &self,
        program: &str,
        input: &Path,
        output: &Path,
    ) -> Result<ExitOutcome, DumpError>;
}

/// Runs `psql` with a `\copy ... to '<file>' csv header` meta-command
#[derive(Debug, Clone)]
pub struct PsqlClient {
    settings: ClientSettings,
}

impl PsqlClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    /// Arguments passed to the client program, without the program itself
    pub fn args(&self, database: &str, query: &str, output: &Path) -> Vec<String> {
        vec![
            "-d".to_string(),
            database.to_string(),
            "-h".to_string(),
            self.settings.host.clone(),
            "-U".to_string(),
            self.settings.role.clone(),
            "-c".to_string(),
            copy_command(query, output),
        ]
    }
}

/// `\copy` is a single-line meta-command, so line breaks in the query are flattened
fn copy_command(query: &str, output: &Path) -> String {
    let query = query.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let output = output.to_string_lossy().replace('\'', "''");
    format!("\\copy ({}) to '{}' csv header;", query.trim(), output)
}

impl QueryClient for PsqlClient {
    async fn export(
        &self,
        database: &str,
        query: &str,
        output: &Path,
    ) -> Result<ExitOutcome, DumpError> {
        let args = self.args(database, query, output);
        debug!("Dumping data to csv file ({} {:?})...", self.settings.program, args);

        let status = Command::new(&self.settings.program)
            .args(&args)
            .status()
            .await
            .map_err(|source| DumpError::Spawn {
                program: self.settings.program.clone(),
                source,
            })?;

        Ok(status.into())
    }
}

/// Invokes `<program> -f <input> <output>`, the calling convention of lz4 and zstd
#[derive(Debug, Clone, Default)]
pub struct CommandCompressor;

impl Compressor for CommandCompressor {
    async fn compress(
        &self,
        program: &str,
        input: &Path,
        output: &Path,
    ) -> Result<ExitOutcome, DumpError> {
        debug!(
            "Compressing data ({} -f {} {})...",
            program,
            input.display(),
            output.display()
        );

        let status = Command::new(program)
            .arg("-f")
            .arg(input)
            .arg(output)
            .status()
            .await
            .map_err(|source| DumpError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(status.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn client() -> PsqlClient {
        PsqlClient::new(ClientSettings {
            program: "psql".to_string(),
            host: "db.internal".to_string(),
            role: "reader".to_string(),
        })
    }

    #[test]
    fn test_psql_args() {
        let output = PathBuf::from("/tmp/out/2022/01/20/events_2022-01-20.csv");
        let args = client().args("db1", "SELECT 1", &output);
        assert_eq!(
            args,
            vec![
                "-d",
                "db1",
                "-h",
                "db.internal",
                "-U",
                "reader",
                "-c",
                "\\copy (SELECT 1) to '/tmp/out/2022/01/20/events_2022-01-20.csv' csv header;",
            ]
        );
    }

    #[test]
    fn test_copy_command_flattens_query() {
        let command = copy_command(
            "SELECT *\n  FROM t\r\nWHERE x = 1\n",
            Path::new("/tmp/it's.csv"),
        );
        assert_eq!(
            command,
            "\\copy (SELECT *   FROM t WHERE x = 1) to '/tmp/it''s.csv' csv header;"
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let client = PsqlClient::new(ClientSettings {
            program: "/nonexistent/dumpit-psql".to_string(),
            host: "localhost".to_string(),
            role: "reader".to_string(),
        });
        let err = client
            .export("db1", "SELECT 1", Path::new("/tmp/never.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compressor_exit_codes() {
        let input = Path::new("/dev/null");
        let output = Path::new("/dev/null");
        assert_eq!(
            CommandCompressor.compress("true", input, output).await.unwrap(),
            ExitOutcome::Success
        );
        assert_eq!(
            CommandCompressor.compress("false", input, output).await.unwrap(),
            ExitOutcome::Failed(Some(1))
        );
    }
}
