use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::Parser;
use roadcast::{
    OpenMeteoClient, OpenMeteoGeocoder, OsrmRouteClient, NominatimResolver, Place,
    RoadcastConfig, Services, SessionSettings, TripSession, TripSnapshot, TripState, logging,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Weather forecasts along a driving route, at the hour you get there"
)]
struct Args {
    /// Where the trip starts: a place name or "lat,lon"
    origin: String,

    /// Where the trip ends: a place name or "lat,lon"
    destination: String,

    /// Departure time (RFC 3339 or "YYYY-MM-DDTHH:MM" in UTC), defaults to now
    #[arg(long, value_parser = parse_departure)]
    depart: Option<DateTime<Utc>>,

    /// Route alternative to use, 0 is the primary route
    #[arg(long, default_value_t = 0)]
    alternative: usize,

    /// Path to a TOML configuration file
    #[arg(long, env = "ROADCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Print the trip as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Keep running and reprint whenever the periodic refresh lands
    #[arg(long)]
    watch: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_departure(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .map(|time| time.and_utc())
        .map_err(|_| format!("'{value}' is not RFC 3339 or YYYY-MM-DDTHH:MM"))
}

fn build_services(config: &RoadcastConfig) -> Result<Services> {
    Ok(Services {
        routes: Arc::new(OsrmRouteClient::new(&config.services)?),
        weather: Arc::new(OpenMeteoClient::new(&config.services, &config.trip)?),
        places: Arc::new(NominatimResolver::new(&config.services, &config.cache)?),
        search: Arc::new(OpenMeteoGeocoder::new(&config.services)?),
    })
}

async fn find_place(session: &TripSession, query: &str) -> Result<Place> {
    let places = session
        .search_destination(query)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    places
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No place found for '{}'", query))
}

fn print_table(snapshot: &TripSnapshot) {
    if let (Some(destination), Some(index)) = (&snapshot.destination, snapshot.selected_route) {
        if let Some(route) = snapshot.routes.get(index) {
            println!(
                "To {} via route {} of {}: {:.0} miles",
                destination.display_name(),
                index,
                snapshot.routes.len(),
                route.geometry.distance_miles()
            );
        }
    }
    println!();

    for forecast in &snapshot.forecasts {
        let weather = forecast.weather.as_ref().map_or_else(
            || "Weather unavailable".to_string(),
            |w| {
                format!(
                    "{:>5}  {:<22} {}",
                    w.format_temperature(),
                    w.description(),
                    w.format_wind()
                )
            },
        );
        println!(
            "{:<12} {}  {:<28} {}",
            forecast.waypoint.label,
            forecast.waypoint.eta_time.format("%a %H:%M"),
            forecast.location_name,
            weather
        );
    }

    let Some(summary) = &snapshot.summary else {
        println!("\nNo weather available for this trip");
        return;
    };
    println!();
    println!(
        "High {:.0}°F near {}, low {:.0}°F near {}",
        summary.max_temp_f,
        summary.max_temp_location,
        summary.min_temp_f,
        summary.min_temp_location
    );
    println!(
        "Strongest wind {:.0} mph near {}",
        summary.max_wind_mph, summary.max_wind_location
    );
    if summary.has_precipitation {
        println!("Precipitation at {} of {} points", summary.precipitation_count, summary.sample_count);
    }
    if summary.has_snow {
        println!("Snow at {} of {} points", summary.snow_count, summary.sample_count);
    }
    if summary.has_severe {
        println!("Severe weather at {} of {} points", summary.severe_count, summary.sample_count);
    }
}

fn print_snapshot(snapshot: &TripSnapshot, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(snapshot).context("Failed to serialize trip")?
        );
    } else {
        print_table(snapshot);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        RoadcastConfig::load_from_path(args.config.clone()).context("Failed to load configuration")?;
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    logging::init(&config.logging)?;

    let settings = SessionSettings::from_config(&config.trip)?;
    let session = TripSession::new(build_services(&config)?, settings);

    let origin = find_place(&session, &args.origin).await?;
    let destination = find_place(&session, &args.destination).await?;
    info!(
        "Planning {} to {}",
        origin.display_name(),
        destination.display_name()
    );

    session.set_origin(origin.coordinate);
    session.set_destination(destination);
    if let Some(departure) = args.depart {
        session.set_departure(departure);
    }

    session
        .request_route()
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    if args.alternative != 0 {
        session
            .select_alternative(args.alternative)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
    }

    let snapshot = session.snapshot();
    if let TripState::Error { message, .. } = &snapshot.state {
        bail!("{}", message);
    }
    print_snapshot(&snapshot, args.json)?;

    if args.watch {
        session.set_auto_refresh(true);
        let mut last_updated = snapshot.last_updated;
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(5));
        loop {
            ticker.tick().await;
            let snapshot = session.snapshot();
            if snapshot.last_updated != last_updated {
                last_updated = snapshot.last_updated;
                println!();
                print_snapshot(&snapshot, args.json)?;
            }
        }
    }

    Ok(())
}
