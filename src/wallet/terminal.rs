//! Terminal signer for air-gapped signing.
//!
//! Implements the extension port over a reader/writer pair: the envelope is
//! printed, signed with an external tool, and the signed envelope pasted
//! back. An empty line or end of input counts as the user cancelling.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::wallet::extension::{InjectedSigner, SignOptions, SignedTxResponse};
use crate::wallet::types::{WalletError, WalletResult};

/// [`InjectedSigner`] driven by a human at a terminal.
pub struct TerminalSigner<R, W> {
    io: Mutex<(R, W)>,
    address: Option<String>,
}

impl TerminalSigner<BufReader<Stdin>, Stdout> {
    /// Signer on the process's stdin/stdout.
    pub fn stdio(address: Option<String>) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), address)
    }
}

impl<R, W> TerminalSigner<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// `address` answers the access prompt without asking.
    pub fn new(reader: R, writer: W, address: Option<String>) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
            address: address.filter(|a| !a.trim().is_empty()),
        }
    }

    /// Consume the signer, returning the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner()
    }

    async fn prompt(&self, text: &str) -> WalletResult<String> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        writer.write_all(text.as_bytes()).await.map_err(io_error)?;
        writer.flush().await.map_err(io_error)?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await.map_err(io_error)?;
        let answer = line.trim();
        if read == 0 || answer.is_empty() {
            return Err(WalletError::Cancelled);
        }
        Ok(answer.to_string())
    }
}

fn io_error(e: std::io::Error) -> WalletError {
    WalletError::Backend(format!("terminal I/O failed: {}", e))
}

#[async_trait]
impl<R, W> InjectedSigner for TerminalSigner<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn is_available(&self) -> bool {
        true
    }

    async fn request_access(&self) -> WalletResult<String> {
        if let Some(address) = &self.address {
            return Ok(address.clone());
        }
        self.prompt("Account address to sign with: ").await
    }

    async fn sign_transaction(&self, xdr: &str, options: &SignOptions) -> WalletResult<SignedTxResponse> {
        let signer = options.address.as_deref().unwrap_or("<unknown>");
        let text = format!(
            "\nSign as {}\nNetwork: {}\nUnsigned envelope:\n{}\n\nSigned envelope (empty line cancels): ",
            signer, options.network_passphrase, xdr
        );
        let signed = self.prompt(&text).await?;
        Ok(SignedTxResponse {
            signed_tx_xdr: signed,
            signer_address: None,
        })
    }
}
