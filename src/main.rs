pub mod api;
pub mod channel;
pub mod client;
pub mod command;
pub mod config;
pub mod legacy;
pub mod lobby;
pub mod model;
pub mod preview;
pub mod render;
pub mod routes;
pub mod stream;
pub mod util;

use crate::api::{ApiClient, Product};
use crate::client::handle_connection;
use crate::config::{ConnSetup, Flags, RenderOpts, Subcommand};
use crate::lobby::{HubOptions, JoinRequest, LobbyClient, LobbyServer};
use crate::render::{render_content, ContentInput};
use crate::routes::Route;
use crate::stream::ClientStream;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::{Report, Result};
use futures_util::future::ready;
use log::*;
use std::future::Future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use structopt::StructOpt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;
use tungstenite::Error;

cfg_if::cfg_if! {
    if #[cfg(debug_assertions)] {
        const DEFAULT_FILTER: &str = "warn,storefront_preview=trace";
    } else {
        const DEFAULT_FILTER: &str = "warn,storefront_preview=info";
    }
}

async fn accept_connection(lc: LobbyClient, peer: SocketAddr, stream: ClientStream) {
    if let Err(report) = handle_connection(lc, peer, stream).await {
        match report.downcast_ref::<Error>() {
            Some(Error::ConnectionClosed) | Some(Error::Protocol(_)) | Some(Error::Utf8) => (),
            _ => error!("Error processing connection: {:?}", report),
        }
    }
}

async fn wait_for_connections<F, R>(
    listener: TcpListener,
    lobby_sender: mpsc::Sender<JoinRequest>,
    map: F,
) where
    F: Fn(TcpStream) -> R,
    R: Future<Output = Result<ClientStream, io::Error>>,
{
    while let Ok((stream, peer)) = listener.accept().await {
        let lc = LobbyClient::from(lobby_sender.clone());
        match map(stream).await {
            Ok(stream) => {
                tokio::spawn(accept_connection(lc, peer, stream));
            }
            Err(e) => error!("Invalid connection request: {:?}", e),
        }
    }
}

async fn serve(setup: config::Setup) -> Result<()> {
    let addr = setup
        .addr
        .as_str()
        .to_socket_addrs()
        .wrap_err("Could not resolve address")?
        .next()
        .ok_or_else(|| eyre!("No address for {}", setup.addr))?;

    let opts = HubOptions {
        preview_base: setup.preview.base_url.clone(),
        debounce: setup.preview.debounce(),
        api: Some(setup.api.client()?),
    };

    let (lobby_sender, lobby_receiver) = mpsc::channel(100);
    tokio::spawn(LobbyServer::new(lobby_receiver, opts).run());

    let listener = TcpListener::bind(&addr).await.wrap_err("Can't listen")?;
    info!("Listening on: {}", addr);

    match setup.conn {
        ConnSetup::Basic => {
            wait_for_connections(listener, lobby_sender, |stream| {
                ready(Ok(ClientStream::Plain(stream)))
            })
            .await;
        }
        #[cfg(feature = "tls")]
        ConnSetup::Tls { certs, mut keys } => {
            use std::sync::Arc;
            use tokio_rustls::rustls::{NoClientAuth, ServerConfig};
            use tokio_rustls::TlsAcceptor;

            let mut config = ServerConfig::new(NoClientAuth::new());
            if keys.is_empty() {
                return Err(eyre!("Key-File contains no keys"));
            }
            config
                .set_single_cert(certs, keys.remove(0))
                .wrap_err("Invalid certificate")?;
            let acceptor = TlsAcceptor::from(Arc::new(config));
            wait_for_connections(listener, lobby_sender, |stream: TcpStream| {
                let acceptor = acceptor.clone();
                async move {
                    let stream = acceptor.accept(stream).await?;
                    Ok::<_, io::Error>(ClientStream::Rustls(Box::new(stream)))
                }
            })
            .await;
        }
    }
    Ok(())
}

/// Fetch the content behind a storefront page
async fn fetch_route(api: &ApiClient, route: &Route) -> Result<Product> {
    let product = match route {
        Route::Product { username, slug } => api.product_by_slug(username, slug).await?,
        Route::ProductShort { slug } => api.product_by_short_slug(slug).await?,
        Route::Checkout { product_id } => api.product(product_id).await?,
        Route::Content { purchase_id } | Route::ThankYou { purchase_id } => {
            api.purchase_content(purchase_id).await?
        }
        other => return Err(eyre!("{} has no product content", other)),
    };
    Ok(product)
}

async fn render(opts: RenderOpts, setup: config::Setup) -> Result<()> {
    let rendered = if let Some(file) = &opts.file {
        let raw = tokio::fs::read_to_string(file)
            .await
            .wrap_err_with(|| format!("Could not read {}", file.display()))?;
        render_content(ContentInput::Encoded(&raw))
    } else {
        let api = setup.api.client()?;
        let product = match (&opts.product, &opts.route) {
            (Some(id), _) => api.product(id).await?,
            (None, Some(path)) => {
                let route: Route = path.parse().wrap_err("Invalid storefront path")?;
                if route.requires_auth() && !api.is_signed_in().await {
                    return Err(eyre!("{} is only available when signed in", route));
                }
                fetch_route(&api, &route).await?
            }
            (None, None) => return Err(eyre!("Pass one of --file, --product or --route")),
        };
        if let Some(minutes) = product.read_time() {
            info!(
                "Rendering {:?}, about {} min read",
                product.title.as_deref().unwrap_or("untitled"),
                minutes
            );
        }
        product.render()
    };

    if rendered.is_failed() {
        warn!("Content could not be read, rendering the error placeholder");
    }
    let html = rendered.to_string();
    match &opts.out {
        Some(out) => tokio::fs::write(out, html)
            .await
            .wrap_err_with(|| format!("Could not write {}", out.display()))?,
        None => println!("{}", html),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    if std::env::var(env_logger::DEFAULT_FILTER_ENV).is_err() {
        std::env::set_var(env_logger::DEFAULT_FILTER_ENV, DEFAULT_FILTER);
    }
    env_logger::init();
    tracing::subscriber::set_global_default(Registry::default().with(ErrorLayer::default()))
        .wrap_err("Could not install the tracing subscriber")?;
    color_eyre::install()?;

    let flags = Flags::from_args();
    let setup = flags.load_cfg().await?;

    match flags.cmd {
        Some(Subcommand::Render(opts)) => render(opts, setup).await,
        Some(Subcommand::Serve) | None => serve(setup).await,
    }
}
