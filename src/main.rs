use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rhodonea_mapper::api::{ApiError, CollectionPayload, HttpLayersClient, LayersApi, RhodoneaRecord, TimelineFilters};
use rhodonea_mapper::app::{Mapper, MapperError};
use rhodonea_mapper::config::{ConfigError, MapperConfig, normalize_base_url};
use rhodonea_mapper::curve::{CurveError, generate};
use rhodonea_mapper::form::{CurveForm, FormField, ValidationError};
use rhodonea_mapper::geo::{Bbox, LatLng};
use rhodonea_mapper::layers::LayerManager;
use rhodonea_mapper::map::{StaticMap, initial_center};
use rhodonea_mapper::notice::TracingNotifier;
use rhodonea_mapper::state::AppContext;
use rhodonea_mapper::timeline::{TimelineError, TimelineRow, build_overlay, overlay_layer_name};
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}", .0.flatten())]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Mapper(#[from] MapperError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "rhodonea-mapper", about = "Draw, publish and browse rose-curve map layers")]
struct Cli {
    /// Overrides `RHODONEA_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One raw page of the collection listing.
    List(ListArgs),
    /// Timeline around a map center, optionally overlaying collections.
    Browse(BrowseArgs),
    /// Rebuild a stored collection and summarize its curves.
    Show { id: u64 },
    /// Sample one curve and publish it as a new collection.
    Draw(DrawArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// `min_lng,min_lat,max_lng,max_lat`
    #[arg(long)]
    bbox: Option<Bbox>,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value_t = 0)]
    offset: u32,
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Args, Debug)]
struct BrowseArgs {
    #[arg(long, requires = "lng")]
    lat: Option<f64>,
    #[arg(long, requires = "lat")]
    lng: Option<f64>,
    /// Half-extent of the viewport in degrees.
    #[arg(long, default_value_t = 0.05)]
    span: f64,
    #[arg(long, default_value = "")]
    search: String,
    /// Collection ids to overlay after listing.
    #[arg(long = "show")]
    show: Vec<u64>,
    /// Follow "load more" this many times.
    #[arg(long, default_value_t = 0)]
    pages: u32,
}

#[derive(Args, Debug)]
struct DrawArgs {
    #[arg(long, default_value = "Untitled")]
    title: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    lat: Option<String>,
    #[arg(long)]
    lng: Option<String>,
    #[arg(long)]
    r: Option<String>,
    #[arg(long)]
    n: Option<String>,
    #[arg(long)]
    d: Option<String>,
    #[arg(long)]
    rotation: Option<String>,
    #[arg(long)]
    nodes_count: Option<String>,
    #[arg(long)]
    stroke_weight: Option<String>,
    #[arg(long)]
    stroke_color: Option<String>,
    /// Start from random parameters instead of the defaults.
    #[arg(long, default_value_t = false)]
    random: bool,
    /// Print the sampled curve as `GeoJSON` instead of publishing it.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

impl DrawArgs {
    fn overrides(&self) -> [(FormField, Option<&String>); 9] {
        [
            (FormField::Lat, self.lat.as_ref()),
            (FormField::Lng, self.lng.as_ref()),
            (FormField::R, self.r.as_ref()),
            (FormField::N, self.n.as_ref()),
            (FormField::D, self.d.as_ref()),
            (FormField::Rotation, self.rotation.as_ref()),
            (FormField::NodesCount, self.nodes_count.as_ref()),
            (FormField::StrokeWeight, self.stroke_weight.as_ref()),
            (FormField::StrokeColor, self.stroke_color.as_ref()),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = MapperConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.api_base_url = normalize_base_url(base_url)?;
    }
    let client = HttpLayersClient::from_config(&config)?;
    tracing::debug!(base_url = %client.base_url(), "layers service");

    match cli.command {
        Command::List(args) => run_list(&client, &config, args).await,
        Command::Browse(args) => run_browse(client, &config, args).await,
        Command::Show { id } => run_show(&client, id).await,
        Command::Draw(args) => run_draw(&client, args).await,
    }
}

async fn run_list(client: &HttpLayersClient, config: &MapperConfig, args: ListArgs) -> Result<(), CliError> {
    let filters = TimelineFilters {
        search: args.search,
        in_bbox: args.bbox,
        offset: args.offset,
        limit: args.limit.unwrap_or(config.page_limit),
    };
    let page = client.list_collections(&filters).await?;
    let now = OffsetDateTime::now_utc();
    for summary in page.results {
        print_row(&TimelineRow::from(summary), now);
    }
    if let Some(next) = page.next {
        println!("next: {next}");
    }
    Ok(())
}

async fn run_browse(client: HttpLayersClient, config: &MapperConfig, args: BrowseArgs) -> Result<(), CliError> {
    let geolocated = args.lat.zip(args.lng).map(|(lat, lng)| LatLng::new(lat, lng));
    let map = Arc::new(StaticMap::around(initial_center(geolocated), args.span));
    let ctx = AppContext::new(Arc::new(client), map, Arc::new(TracingNotifier));
    let mut mapper = Mapper::new(ctx, config);

    mapper.timeline_mut().set_search(args.search);
    mapper.boot().await?;
    for _ in 0..args.pages {
        if !mapper.timeline_mut().load_more().await? {
            break;
        }
    }
    for id in args.show {
        mapper.timeline_mut().toggle_on(id).await?;
    }

    let now = OffsetDateTime::now_utc();
    match mapper.timeline().empty_notice() {
        Some(notice) => println!("{notice}"),
        None => mapper.timeline().rows().iter().for_each(|row| print_row(row, now)),
    }
    let layers = mapper.context().layers();
    for layer in layers.layers() {
        println!("overlay {}: {} curves", layer.name, layers.store().features_of(&layer.name).len());
    }
    Ok(())
}

async fn run_show(client: &HttpLayersClient, id: u64) -> Result<(), CliError> {
    let detail = client.fetch_collection(id).await?;
    let name = overlay_layer_name(detail.id);
    let mut layers = LayerManager::new();
    let curves = build_overlay(&mut layers, &name, &detail.rhodoneas)?;
    println!("{} ({curves} curves)", detail.title);

    let features: Vec<_> = layers.store().features_of(&name).into_iter().cloned().collect();
    for feature in features {
        let style = layers.style_of(&feature.id);
        println!(
            "  {:<24} {:>5} points  weight {:<4} color {}",
            feature.props().name(),
            feature.geometry.len(),
            style.as_ref().map_or(0.0, |s| s.stroke_weight),
            style.as_ref().map_or("", |s| s.stroke_color.as_str()),
        );
    }
    Ok(())
}

async fn run_draw(client: &HttpLayersClient, args: DrawArgs) -> Result<(), CliError> {
    let mut form = CurveForm::new();
    if args.random {
        form.set_random(&mut rand::rng());
    }
    form.set(FormField::Name, args.name.clone());
    for (field, value) in args.overrides() {
        if let Some(value) = value {
            form.set(field, value.clone());
        }
    }
    let params = form.validate(true)?;
    let curve = generate(&params)?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&curve.to_geojson())?);
        return Ok(());
    }

    let payload = CollectionPayload { title: args.title, rhodoneas: vec![RhodoneaRecord::from(&params)] };
    let created = client.create_collection(&payload).await?;
    println!("created collection {} with {} points", created.id, curve.len());
    Ok(())
}

fn print_row(row: &TimelineRow, now: OffsetDateTime) {
    let bbox = row.bbox.map(|b| b.to_string()).unwrap_or_default();
    println!(
        "{:>6}  {:<32} {:>4} visits  {:<18} {bbox}",
        row.id,
        row.title,
        row.visits,
        row.age_label(now)
    );
}
