use clap::Args;
use serde_json::Value;

use elfinder_daemon::http_server::client::ApiError;

/// List a directory of a running daemon through the connector
#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Hash of the directory to list (default volume root if omitted)
    pub target: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut params = vec![("cmd", "open")];
        match &self.target {
            Some(target) => params.push(("target", target.as_str())),
            None => params.push(("init", "1")),
        }

        let body = ctx.client.connector(&params).await?;
        let cwd = body["cwd"]["hash"].as_str().unwrap_or_default();

        let mut lines = vec![format!(
            "{} ({})",
            body["options"]["path"].as_str().unwrap_or_default(),
            cwd
        )];
        let files = body["files"].as_array().map(Vec::as_slice).unwrap_or_default();
        for file in files.iter().filter(|f| f["phash"].as_str() == Some(cwd)) {
            lines.push(format_entry(file));
        }

        Ok(lines.join("\n"))
    }
}

fn format_entry(file: &Value) -> String {
    let kind = if file["mime"] == "directory" { "d" } else { "-" };
    format!(
        "{} {:>10} {}  {}",
        kind,
        file["size"].as_u64().unwrap_or_default(),
        file["hash"].as_str().unwrap_or_default(),
        file["name"].as_str().unwrap_or_default()
    )
}
