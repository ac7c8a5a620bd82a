use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Where the model store lives
#[derive(clap::Args, Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the model artifacts, feature column lists and label mappings
    #[arg(short, long, env = "AMR_MODEL_DIR", default_value = "models")]
    pub model_dir: PathBuf,
}

/// Everything the prediction server needs at startup
#[derive(clap::Args, Debug, Clone)]
pub struct ServeConfig {
    #[command(flatten)]
    pub store: StoreConfig,

    /// JSON file mapping raw categorical values to feature columns
    #[arg(short, long, env = "AMR_ENCODER_MAPPING", default_value = "encoder_mapping.json")]
    pub encoder_mapping: PathBuf,

    /// Address to listen on
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,
}

impl ServeConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
