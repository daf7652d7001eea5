use crate::{
    classify::{Classifier, FileCommand, MagicBytes},
    error::AppError,
    filename::NamingScheme,
    storage,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments. Every flag can also be set from the environment (or `.env`).
#[derive(Parser, Debug, Clone)]
#[command(name = "ezfile", version, about = "Accept file uploads over HTTP POST")]
pub struct Args {
    /// Address to listen on (all interfaces by default)
    #[arg(long, env = "EZFILE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "EZFILE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Expect application/x-www-form-urlencoded bodies instead of multipart/form-data
    #[arg(long, env = "EZFILE_URLENCODED")]
    pub urlencoded: bool,

    /// Reject request bodies larger than this many bytes
    #[arg(long, env = "EZFILE_MAX_UPLOAD_SIZE")]
    pub max_upload_size: Option<usize>,

    /// Directory to store uploads in (home directory by default)
    #[arg(long, env = "EZFILE_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Append the detected MIME type to every stored file name
    #[arg(long, env = "EZFILE_TAG_TYPES")]
    pub tag_types: bool,

    /// Classifier used for --tag-types
    #[arg(long, env = "EZFILE_CLASSIFIER", value_enum, default_value_t = ClassifierKind::File)]
    pub classifier: ClassifierKind,

    /// Program invoked by the `file` classifier
    #[arg(long, env = "EZFILE_CLASSIFIER_PROGRAM", default_value = "file")]
    pub classifier_program: String,

    /// Name uploads without a filename by epoch seconds instead of sniffing their content
    #[arg(long, env = "EZFILE_NO_SNIFF")]
    pub no_sniff: bool,

    /// Skip the public address lookup in the startup banner
    #[arg(long, env = "EZFILE_OFFLINE")]
    pub offline: bool,

    /// Don't print the startup banner
    #[arg(short, long, env = "EZFILE_QUIET")]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Run an external `file --brief --mime-type`
    File,
    /// Sniff magic bytes in-process
    Builtin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    Multipart,
    UrlEncoded,
}

/// Immutable startup configuration.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mode: UploadMode,
    pub max_upload_size: Option<usize>,
    pub upload_root: PathBuf,
    pub naming: NamingScheme,
    pub tagger: Option<Arc<dyn Classifier>>,
    pub lookup_public_ip: bool,
    pub banner: bool,
}

impl Config {
    /// Builds the configuration, creating the upload directory if one was given.
    pub async fn load(args: &Args) -> Result<Self, AppError> {
        let upload_root = storage::resolve_root(args.upload_dir.as_deref()).await?;

        let tagger: Option<Arc<dyn Classifier>> = match (args.tag_types, args.classifier) {
            (false, _) => None,
            (true, ClassifierKind::File) => {
                Some(Arc::new(FileCommand::new(args.classifier_program.clone())))
            }
            (true, ClassifierKind::Builtin) => Some(Arc::new(MagicBytes)),
        };

        Ok(Self {
            host: args.host.clone(),
            port: args.port,
            mode: if args.urlencoded {
                UploadMode::UrlEncoded
            } else {
                UploadMode::Multipart
            },
            max_upload_size: args.max_upload_size,
            upload_root,
            naming: if args.no_sniff {
                NamingScheme::Epoch
            } else {
                NamingScheme::Sniffed
            },
            tagger,
            lookup_public_ip: !args.offline,
            banner: !args.quiet,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when bound to every interface.
    pub fn all_interfaces(&self) -> bool {
        self.host.is_empty() || self.host == "0.0.0.0"
    }
}
