use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use meteo_stats::config::Config;
use meteo_stats::ingest::{
    self, CityLoadReport, IngestError, Ingestor, LoadOutcome, LoadStrategy,
};
use meteo_stats::meteo::{MeteoClient, OpenMeteoClient};
use meteo_stats::models::City;
use meteo_stats::storage::{self, CityRepository, Storage, WeatherRepository};

#[derive(Parser)]
#[command(name = "meteo-stats-admin")]
#[command(about = "Meteo stats ingestion and maintenance CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load hourly temperature and precipitation for a city from Open-Meteo
    Load {
        /// The name of the city to load data for
        city_name: String,
        /// The start date (YYYY-MM-DD)
        start_date: NaiveDate,
        /// The end date (YYYY-MM-DD)
        end_date: NaiveDate,
        /// What to do when several cities share the name
        #[arg(long, value_enum, default_value_t = Strategy::First)]
        strategy: Strategy,
        /// Candidate to load with `--strategy index`, counting from 0
        #[arg(long)]
        index: Option<usize>,
    },
    /// List stored cities
    Cities,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Load the first candidate
    First,
    /// Load every candidate
    All,
    /// Pick a candidate interactively
    Select,
    /// Load the candidate given by --index
    Index,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Load {
            city_name,
            start_date,
            end_date,
            strategy,
            index,
        } => {
            ingest::check_range(start_date, end_date)?;
            let strategy = match strategy {
                Strategy::First => Some(LoadStrategy::First),
                Strategy::All => Some(LoadStrategy::All),
                Strategy::Index => {
                    let index = index.ok_or(IngestError::MissingIndex)?;
                    Some(LoadStrategy::Index(index))
                }
                Strategy::Select => None,
            };

            let storage = storage::connect(&config.database).await?;
            let meteo = OpenMeteoClient::new(&config.meteo);

            load(
                &meteo,
                storage.as_ref(),
                &city_name,
                start_date,
                end_date,
                strategy,
            )
            .await?;
        }
        Commands::Cities => {
            let storage = storage::connect(&config.database).await?;
            let cities = storage.get_all_cities().await?;

            if cities.is_empty() {
                println!("No cities stored");
            } else {
                println!("Stored cities:");
                for city in cities {
                    println!("  {:>4}  {}", city.id.unwrap_or_default(), city);
                }
            }
        }
    }

    Ok(())
}

async fn load(
    meteo: &dyn MeteoClient,
    storage: &dyn Storage,
    city_name: &str,
    start: NaiveDate,
    end: NaiveDate,
    strategy: Option<LoadStrategy>,
) -> Result<()> {
    let ingestor = Ingestor::new(meteo, storage, storage);

    let outcome = match strategy {
        Some(strategy) => ingestor.load(city_name, start, end, strategy).await,
        None => select_and_load(&ingestor, city_name, start, end).await,
    };

    match outcome {
        Ok(LoadOutcome::NoCitiesFound) => {
            println!("No cities found with the name {}, exiting...", city_name);
        }
        Ok(LoadOutcome::IndexOutOfRange { index, available }) => {
            eprintln!(
                "There are not enough retrieved cities for the index '{}'... \
                 Remember that the index must go from 0 to N-1 being N the number of \
                 cities retrieved: {}",
                index, available
            );
        }
        Ok(LoadOutcome::Loaded(reports)) => {
            for report in &reports {
                print_report(report, start, end);
            }
        }
        Err(IngestError::Meteo(e)) => match e.status() {
            Some(status) => eprintln!(
                "Error retrieving '{}' from external API. status code: {}",
                city_name, status
            ),
            None => {
                return Err(e).context(format!(
                    "Error retrieving '{}' from external API",
                    city_name
                ))
            }
        },
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Interactive variant of `load`: list the candidates and read the choice from stdin
async fn select_and_load<M, C, W>(
    ingestor: &Ingestor<'_, M, C, W>,
    city_name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<LoadOutcome, IngestError>
where
    M: MeteoClient + ?Sized,
    C: CityRepository + ?Sized,
    W: WeatherRepository + ?Sized,
{
    let candidates = ingestor.candidates(city_name).await?;
    if candidates.is_empty() {
        return Ok(LoadOutcome::NoCitiesFound);
    }

    let stdin = BufReader::new(io::stdin());
    let Some(city) = prompt_for_city(&candidates, stdin, &mut io::stdout()).await else {
        eprintln!("Invalid input! It had to be a number within the specified bounds!");
        return Ok(LoadOutcome::Loaded(Vec::new()));
    };

    let report = ingestor.load_city(city, start, end).await?;
    Ok(LoadOutcome::Loaded(vec![report]))
}

/// List the candidates on `output` and read the chosen index from `input`
async fn prompt_for_city<'a, R, W>(
    candidates: &'a [City],
    mut input: R,
    output: &mut W,
) -> Option<&'a City>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut prompt = String::from("Please, select a city by its number:\n");
    for (i, city) in candidates.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i, city));
    }
    prompt.push_str(&format!("Enter number from 0 to {}: ", candidates.len() - 1));
    output.write_all(prompt.as_bytes()).await.ok()?;
    output.flush().await.ok()?;

    let mut line = String::new();
    input.read_line(&mut line).await.ok()?;
    let index = line.trim().parse::<usize>().ok()?;
    candidates.get(index)
}

fn print_report(report: &CityLoadReport, start: NaiveDate, end: NaiveDate) {
    let city = &report.city;

    if report.already_existed {
        println!(
            "City '{}' already exists in the database. Skipping insert...",
            city.name
        );
    }

    if report.fetched == 0 {
        println!(
            "No weather data for city '{}' [{}, {}] found in the specified dates!",
            city.name, city.latitude, city.longitude
        );
        return;
    }

    println!(
        "✓ City '{}' [{}, {}] weather data successfully inserted from {} to {}! ({} new of {} hourly readings)",
        city.name, city.latitude, city.longitude, start, end, report.inserted, report.fetched
    );
}
