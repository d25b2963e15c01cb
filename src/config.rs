//! Command line and environment configuration
//!
//! Every flag can also come from the environment (a `.env` file is loaded
//! before parsing), so the server can be configured without arguments.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

/// Default location of the legacy edition
pub const DEFAULT_SOURCE_BASE: &str = "https://www.ada.auckland.ac.nz/";

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the normalizing API server
    Serve(ServeArgs),
    /// Read chapters in the terminal against a running server
    Read(ReadArgs),
    /// Print the chapter catalog as JSON
    Chapters(CatalogArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "ADA_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,
    #[arg(long, env = "ADA_SOURCE_BASE", default_value = DEFAULT_SOURCE_BASE)]
    pub source_base: String,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[arg(long, env = "ADA_SOURCE_BASE", default_value = DEFAULT_SOURCE_BASE)]
    pub source_base: String,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[arg(long, env = "ADA_SERVER_URL", default_value = "http://127.0.0.1:3000/")]
    pub server: String,
    #[arg(long, env = "ADA_READER_LOG", default_value = "ada-reader.log")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub source_base: Url,
}

impl ServerConfig {
    pub fn from_args(args: &ServeArgs) -> Result<Self> {
        Ok(Self {
            bind: args.bind,
            source_base: parse_base_url(&args.source_base)
                .context("Invalid --source-base")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub server: Url,
    pub log_file: PathBuf,
}

impl ReaderConfig {
    pub fn from_args(args: &ReadArgs) -> Result<Self> {
        Ok(Self {
            server: parse_base_url(&args.server).context("Invalid --server")?,
            log_file: args.log_file.clone(),
        })
    }
}

/// Parse a base URL, forcing a trailing slash so joins stay underneath it
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&with_slash).with_context(|| format!("Not a URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Unsupported scheme in {}", raw);
    }
    Ok(url)
}
