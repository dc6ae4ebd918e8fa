//! Stdio transport.
//!
//! One JSON-RPC envelope per line on stdin, one response per line on stdout.
//! Logs must go to stderr in this mode.

use crate::error::{DbError, DbResult};
use crate::rpc::RpcProcessor;
use crate::transport::{Transport, wait_for_signal};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, trace};

pub struct StdioTransport {
    processor: RpcProcessor,
}

impl StdioTransport {
    pub fn new(processor: RpcProcessor) -> Self {
        Self { processor }
    }

    /// Serve line-delimited envelopes from `reader` until end of input.
    ///
    /// Requests are handled one at a time, so responses come out in input order.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> DbResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.map_err(io_error)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            trace!(line, "Received line");

            let Some(response) = self.processor.handle_text(line).await else {
                continue;
            };
            let mut frame = serde_json::to_string(&response)
                .map_err(|e| DbError::internal(format!("Failed to encode response: {}", e)))?;
            frame.push('\n');
            writer.write_all(frame.as_bytes()).await.map_err(io_error)?;
            writer.flush().await.map_err(io_error)?;
            debug!(id = %response.id, "Sent response");
        }
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> DbError {
    DbError::transport(format!("stdio: {}", e))
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Serving JSON-RPC on stdio");

        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();

        let result = tokio::select! {
            result = self.serve(reader, writer) => {
                info!("Input closed");
                result
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        info!("Closing database connections");
        self.processor.server().tools().service().close().await;
        result
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseSettings, PoolSettings};
    use crate::db::PostgresService;
    use crate::rpc::{RpcResponse, RpcServer};
    use crate::tools::ToolDispatcher;

    fn transport() -> StdioTransport {
        let db = DatabaseSettings::from_parts("127.0.0.1", 1, "u", "p", "d").unwrap();
        let service = PostgresService::new(db, PoolSettings::default());
        StdioTransport::new(RpcProcessor::new(RpcServer::new(ToolDispatcher::new(service))))
    }

    async fn run_lines(input: &str) -> Vec<RpcResponse> {
        let mut output = Vec::new();
        transport()
            .serve(input.as_bytes(), &mut output)
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_stdio_transport_name() {
        assert_eq!(transport().name(), "stdio");
    }

    #[tokio::test]
    async fn test_one_response_per_request_in_order() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"ping","id":1}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"echo","arguments":{"message":"x"}},"id":"b"}"#,
            "\n",
            "not json\n",
        );
        let responses = run_lines(input).await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, 1.into());
        assert_eq!(responses[1].id, "b".into());
        assert_eq!(responses[2].error_object().unwrap().code, -32700);
    }
}
