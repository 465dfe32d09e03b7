use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{HttpFoodsApi, MenuController};
use rust_decimal::Decimal;
use shared::{
    domain::FoodId,
    protocol::{FoodDraft, FoodPatch, FoodRecord},
};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "foods", about = "Command-line front end for the food dashboard API")]
struct Args {
    /// Base URL of the REST collaborator.
    #[arg(long, default_value = "http://localhost:3333")]
    server_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every food on the menu.
    List,
    /// Create a food; new foods are always submitted as available.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        image: String,
    },
    /// Patch fields of an existing food.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        available: Option<bool>,
    },
    /// Delete a food by id. The local list drops the entry even if the
    /// server call fails.
    Delete { id: i64 },
    /// Flip a food's availability.
    Toggle { id: i64 },
}

fn validate_price(price: &str) -> Result<()> {
    price
        .parse::<Decimal>()
        .map(|_| ())
        .with_context(|| format!("price '{price}' is not a decimal amount"))
}

fn validate_image(image: &str) -> Result<()> {
    Url::parse(image)
        .map(|_| ())
        .with_context(|| format!("image '{image}' is not a valid URL"))
}

fn print_food(record: &FoodRecord) {
    let marker = if record.available {
        "available"
    } else {
        "unavailable"
    };
    println!("#{} {} R$ {} ({marker})", record.id, record.name, record.price);
    println!("    {}", record.description);
    println!("    {}", record.image);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let api = HttpFoodsApi::new(&args.server_url)?;
    let mut controller = MenuController::new(Arc::new(api));
    controller
        .load()
        .await
        .context("failed to load the food list")?;

    match args.command {
        Command::List => {
            if controller.store().is_empty() {
                println!("the menu is empty");
            }
            for record in controller.records() {
                print_food(record);
            }
        }
        Command::Add {
            name,
            description,
            price,
            image,
        } => {
            validate_price(&price)?;
            validate_image(&image)?;
            let created = controller
                .create(FoodDraft {
                    name,
                    description,
                    price,
                    image,
                })
                .await?;
            println!("created:");
            print_food(&created);
        }
        Command::Update {
            id,
            name,
            description,
            price,
            image,
            available,
        } => {
            if let Some(price) = &price {
                validate_price(price)?;
            }
            if let Some(image) = &image {
                validate_image(image)?;
            }
            let patch = FoodPatch {
                name,
                description,
                price,
                image,
                available,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let updated = controller.update(FoodId(id), patch).await?;
            println!("updated:");
            print_food(&updated);
        }
        Command::Delete { id } => {
            controller.delete(FoodId(id)).await?;
            println!("deleted food {id}");
        }
        Command::Toggle { id } => {
            let current = controller
                .store()
                .get(FoodId(id))
                .map(|record| record.available)
                .with_context(|| format!("no food with id {id}"))?;
            let updated = controller.set_available(FoodId(id), !current).await?;
            print_food(&updated);
        }
    }

    Ok(())
}
