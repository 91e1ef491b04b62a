use clap::{Parser, Subcommand};
use log::*;
use serde::Serialize;
use std::path::PathBuf;
use tz_globe::config::{Config, SourceLocation};
use tz_globe::render::{BufferPrimitives, GeometryBuffers, GeometryKind, Globe, RenderOptions, SphereRenderer, OVERLAY_NAME};
use tz_globe::service::{self, TimezoneService};
use tz_globe::Error;

#[derive(Parser, Debug)]
#[command(author, version, about = "Timezone lookup and globe boundary geometry")]
struct Args {
    /// Dataset location: http(s) URL or file path (overrides TZ_GLOBE_SOURCE)
    #[arg(long)]
    source: Option<String>,

    /// Directory of the durable cache (overrides TZ_GLOBE_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Keep the dataset cache in memory only
    #[arg(long)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the timezone containing a point
    Locate {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },

    /// List timezones currently at a UTC offset (hours, e.g. 5.75)
    Offset {
        #[arg(allow_negative_numbers = true)]
        hours: f64,
    },

    /// Build border and fill geometry for one timezone
    Render {
        tzid: String,

        #[command(flatten)]
        output: RenderArgs,
    },

    /// Build geometry for every timezone currently at a UTC offset
    RenderOffset {
        #[arg(allow_negative_numbers = true)]
        hours: f64,

        #[command(flatten)]
        output: RenderArgs,
    },

    /// List every tzid in the dataset
    Zones,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Radius of the globe the overlay is placed on
    #[arg(long, default_value_t = 1.0)]
    radius: f64,

    /// Only emit border loops
    #[arg(long)]
    no_fill: bool,

    /// Include the full vertex and index buffers in the output
    #[arg(long)]
    buffers: bool,
}

#[derive(Serialize)]
struct GeometrySummary<'a> {
    kind: GeometryKind,
    vertices: usize,
    triangles: usize,
    render_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffers: Option<&'a GeometryBuffers>,
}

#[derive(Serialize)]
struct RenderSummary<'a> {
    ring_sets: usize,
    geometries: Vec<GeometrySummary<'a>>,
}


#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let mut config = Config::from_env()?;
    if let Some(source) = &args.source {
        config.source = Some(SourceLocation::parse(source)?);
    }
    if let Some(dir) = args.cache_dir {
        config.cache_dir = Some(dir);
    }
    if args.no_cache {
        config.cache_dir = None;
    }

    if service::install(TimezoneService::from_config(&config)?).is_err() {
        warn!("Timezone service was already installed, keeping the existing one");
    }
    let service = service::global();

    match args.command {
        Command::Locate { lat, lon } => {
            let info = service.find_timezone_info_at(lat, lon).await;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Offset { hours } => {
            let tzids = service.find_timezones_for_offset(hours).await;
            println!("{}", serde_json::to_string_pretty(&tzids)?);
        }
        Command::Render { tzid, output } => {
            let (mut renderer, mut globe) = render_target(&output);
            let ring_sets = service.render_feature(&mut renderer, &mut globe, &tzid).await;
            print_render(ring_sets, &renderer, &globe, output.buffers)?;
        }
        Command::RenderOffset { hours, output } => {
            let (mut renderer, mut globe) = render_target(&output);
            let ring_sets = service.render_offset(&mut renderer, &mut globe, hours).await;
            print_render(ring_sets, &renderer, &globe, output.buffers)?;
        }
        Command::Zones => {
            let collection = service.ensure_loaded().await;
            for tzid in collection.tzids() {
                println!("{}", tzid);
            }
        }
    }

    // let a fresh download reach the cache before the process exits
    service.store().flush().await;
    Ok(())
}

fn render_target(output: &RenderArgs) -> (SphereRenderer<BufferPrimitives>, Globe) {
    let renderer = SphereRenderer::new(BufferPrimitives::new())
        .with_options(RenderOptions { fill: !output.no_fill });
    (renderer, Globe::new(output.radius))
}

fn print_render(ring_sets: usize, renderer: &SphereRenderer<BufferPrimitives>, globe: &Globe,
                include_buffers: bool) -> Result<(), Error>
{
    let handles = globe.overlay(OVERLAY_NAME).map(|group| group.children()).unwrap_or_default();

    let geometries = handles.iter()
        .filter_map(|&handle| renderer.primitives().get(handle))
        .map(|buffers| GeometrySummary {
            kind: buffers.kind,
            vertices: buffers.positions.len(),
            triangles: buffers.triangle_count(),
            render_order: buffers.render_order,
            buffers: include_buffers.then_some(buffers),
        })
        .collect();

    let summary = RenderSummary { ring_sets, geometries };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
