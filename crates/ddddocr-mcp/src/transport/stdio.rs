//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

/// Stdio transport for desktop MCP clients.
///
/// Messages are handled one at a time in arrival order, so replies are
/// written in the order their requests were read.
pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Run the transport loop on the process's stdin and stdout.
    pub async fn run(&self) -> McpResult<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        tracing::info!("Stdio transport started");
        self.serve(reader, writer).await
    }

    /// Serve until the reader hits EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let bytes_read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(McpError::Io)?;

            if bytes_read == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break;
            }

            let reply = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => match framing::parse_message(line) {
                    Ok(msg) => self.handler.handle_message(msg).await,
                    Err(e) => {
                        tracing::warn!("Parse error: {e}");
                        Some(framing::undecodable_reply(&e)?)
                    }
                },
                Err(e) => {
                    tracing::warn!("Discarding line that is not UTF-8: {e}");
                    let err = McpError::ParseError(format!("message is not valid UTF-8: {e}"));
                    Some(framing::undecodable_reply(&err)?)
                }
            };

            if let Some(reply) = reply {
                let framed = framing::frame_message(&reply)?;
                writer
                    .write_all(framed.as_bytes())
                    .await
                    .map_err(McpError::Io)?;
                writer.flush().await.map_err(McpError::Io)?;
            }
        }

        Ok(())
    }
}
