/// Petal Gallery server binary
use petal_gallery::{config::ServerConfig, server, AppContext, GalleryResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> GalleryResult<()> {
    let config = ServerConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("petal_gallery={},tower_http=info", config.logging.level).into()
    });
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        print_banner();
    }

    let ctx = AppContext::new(config).await?;
    server::serve(ctx).await
}

fn print_banner() {
    println!(
        r#"
    ____       __        __   ______      ____
   / __ \___  / /_____ _/ /  / ____/___ _/ / /__  _______  __
  / /_/ / _ \/ __/ __ `/ /  / / __/ __ `/ / / _ \/ ___/ / / /
 / ____/  __/ /_/ /_/ / /  / /_/ / /_/ / / /  __/ /  / /_/ /
/_/    \___/\__/\__,_/_/   \____/\__,_/_/_/\___/_/   \__, /
                                                    /____/
        Petal Gallery v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
