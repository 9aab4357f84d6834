//! Subcommands and their handlers. Results go to stdout as JSON.

use clap::{Args, Subcommand};
use marketplace::models::{
    Address, BookingKind, BookingRequest, CancellationPolicy, PersonalData, Rental, RentalRequest, SpaceFilter,
    SpaceInput, SpaceKind,
};
use marketplace::services::dashboard::series;
use serde_json::{Value, json};
use session::access::{Access, Area, decide};
use session::{Role, SessionRecord, SessionState};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::info;

use crate::CliError;
use crate::console::{print_json, route_hint};
use crate::state::App;

const GOOGLE_PROVIDER: &str = "google.com";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password, or with a Google ID token.
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "FLEXRENT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long, conflicts_with = "email")]
        google_id_token: Option<String>,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FLEXRENT_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, value_parser = parse_role)]
        role: Role,
    },
    Logout,
    /// Show the signed-in user and where they land.
    Whoami,
    /// Force a token refresh now.
    Refresh,
    /// Keep the session alive and print every state change until Ctrl-C.
    Watch,
    Spaces(SpacesCommand),
    Bookings(BookingsCommand),
    Rentals(RentalsCommand),
    Invoices(InvoicesCommand),
    Profile(ProfileCommand),
    /// KPIs and the revenue or spend chart for the current role.
    Dashboard,
}

// =============================================================================
// SPACES
// =============================================================================

#[derive(Args, Debug)]
pub struct SpacesCommand {
    #[command(subcommand)]
    command: SpacesSubcommand,
}

#[derive(Subcommand, Debug)]
enum SpacesSubcommand {
    Search {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        kind: Option<SpaceKind>,
        #[arg(long)]
        min_capacity: Option<u32>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long = "amenity")]
        amenities: Vec<String>,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = marketplace::models::space::DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    Show {
        id: i64,
    },
    /// Spaces published by the signed-in provider.
    Mine,
    Create(SpaceArgs),
    Update {
        id: i64,
        #[command(flatten)]
        space: SpaceArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct SpaceArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    kind: SpaceKind,
    #[arg(long)]
    city: String,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    capacity: u32,
    #[arg(long = "amenity")]
    amenities: Vec<String>,
    #[arg(long)]
    hourly_price: Option<f64>,
    #[arg(long)]
    daily_price: Option<f64>,
    #[arg(long)]
    monthly_price: Option<f64>,
}

impl From<SpaceArgs> for SpaceInput {
    fn from(args: SpaceArgs) -> Self {
        Self {
            name: args.name,
            description: args.description,
            kind: args.kind,
            city: args.city,
            address: args.address,
            capacity: args.capacity,
            amenities: args.amenities,
            hourly_price: args.hourly_price,
            daily_price: args.daily_price,
            monthly_price: args.monthly_price,
        }
    }
}

// =============================================================================
// BOOKINGS & RENTALS
// =============================================================================

#[derive(Args, Debug)]
pub struct BookingsCommand {
    #[command(subcommand)]
    command: BookingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum BookingsSubcommand {
    List,
    Quote(BookingArgs),
    Create {
        #[command(flatten)]
        booking: BookingArgs,
        #[arg(long)]
        notes: Option<String>,
    },
    Cancel {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct BookingArgs {
    #[arg(long)]
    space_id: i64,
    #[arg(long)]
    kind: BookingKind,
    /// RFC 3339, e.g. 2025-05-06T10:00:00-05:00
    #[arg(long, value_parser = parse_datetime)]
    start: OffsetDateTime,
    #[arg(long, value_parser = parse_datetime)]
    end: OffsetDateTime,
}

impl BookingArgs {
    fn request(self, notes: Option<String>) -> BookingRequest {
        BookingRequest { space_id: self.space_id, kind: self.kind, start: self.start, end: self.end, notes }
    }
}

#[derive(Args, Debug)]
pub struct RentalsCommand {
    #[command(subcommand)]
    command: RentalsSubcommand,
}

#[derive(Subcommand, Debug)]
enum RentalsSubcommand {
    List,
    Create {
        #[arg(long)]
        space_id: i64,
        /// YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        start: Date,
        #[arg(long)]
        months: u32,
        #[arg(long, default_value_t = false)]
        auto_renewal: bool,
        #[arg(long, default_value_t = CancellationPolicy::Moderate)]
        policy: CancellationPolicy,
    },
    /// Show what cancelling costs; pass --confirm to cancel.
    Cancel {
        id: i64,
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
    AutoRenewal {
        id: i64,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

// =============================================================================
// INVOICES & PROFILE
// =============================================================================

#[derive(Args, Debug)]
pub struct InvoicesCommand {
    #[command(subcommand)]
    command: InvoicesSubcommand,
}

#[derive(Subcommand, Debug)]
enum InvoicesSubcommand {
    List,
    Show {
        id: i64,
    },
    /// Open a hosted checkout and print its URL.
    Pay {
        id: i64,
    },
    /// Record the return from checkout, given the return URL or its query.
    Return {
        id: i64,
        query: String,
    },
}

#[derive(Args, Debug)]
pub struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    SetPersonal {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        document_type: String,
        #[arg(long)]
        document_number: String,
        #[arg(long)]
        phone: String,
        #[arg(long, value_parser = parse_date)]
        birth_date: Option<Date>,
    },
    AddAddress {
        #[arg(long)]
        street: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        province: String,
        #[arg(long)]
        postal_code: String,
        #[arg(long)]
        country: String,
    },
    DeleteAddress {
        id: i64,
    },
    SetRole {
        #[arg(value_parser = parse_role)]
        role: Role,
    },
}

// =============================================================================
// DISPATCH
// =============================================================================

pub async fn run(app: &App, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password, google_id_token } => {
            let record = match (google_id_token, email, password) {
                (Some(token), _, _) => app.auth().login_with_idp(GOOGLE_PROVIDER, &token).await?,
                (None, Some(email), Some(password)) => app.auth().login(&email, &password).await?,
                _ => return Err(CliError::Usage("pass --email and --password, or --google-id-token".into())),
            };
            print_json(&describe_record(&record))
        }
        Command::Register { email, password, role } => {
            let record = app.auth().register(&email, &password, role).await?;
            print_json(&describe_record(&record))
        }
        Command::Logout => {
            app.auth().logout().await;
            print_json(&json!({ "signedOut": true }))
        }
        Command::Whoami => print_json(&describe_state(&app.bridge.snapshot())),
        Command::Refresh => {
            app.bridge.force_refresh().await?;
            print_json(&json!({ "refreshed": true }))
        }
        Command::Watch => watch(app).await,
        Command::Spaces(spaces) => run_spaces(app, spaces.command).await,
        Command::Bookings(bookings) => run_bookings(app, bookings.command).await,
        Command::Rentals(rentals) => run_rentals(app, rentals.command).await,
        Command::Invoices(invoices) => run_invoices(app, invoices.command).await,
        Command::Profile(profile) => run_profile(app, profile.command).await,
        Command::Dashboard => run_dashboard(app).await,
    }
}

async fn watch(app: &App) -> Result<(), CliError> {
    let _scheduler = app.refresh_scheduler();
    let mut states = app.bridge.subscribe();
    print_json(&describe_state(&states.borrow_and_update()))?;
    info!(interval_secs = app.session_config.refresh_interval.as_secs(), "watching session");
    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = states.borrow_and_update().clone();
                print_json(&describe_state(&state))?;
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

async fn run_spaces(app: &App, command: SpacesSubcommand) -> Result<(), CliError> {
    let spaces = app.spaces();
    match command {
        SpacesSubcommand::Search { city, kind, min_capacity, max_price, amenities, page, size } => {
            let filter = SpaceFilter { city, kind, min_capacity, max_price, amenities, page, size };
            print_json(&spaces.search(&filter).await?)
        }
        SpacesSubcommand::Show { id } => print_json(&spaces.get(id).await?),
        SpacesSubcommand::Mine => {
            require(app, Area::Provider)?;
            print_json(&spaces.mine().await?)
        }
        SpacesSubcommand::Create(args) => {
            require(app, Area::Provider)?;
            print_json(&spaces.create(&args.into()).await?)
        }
        SpacesSubcommand::Update { id, space } => {
            require(app, Area::Provider)?;
            print_json(&spaces.update(id, &space.into()).await?)
        }
        SpacesSubcommand::Delete { id } => {
            require(app, Area::Provider)?;
            spaces.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn run_bookings(app: &App, command: BookingsSubcommand) -> Result<(), CliError> {
    require(app, Area::Client)?;
    let bookings = app.bookings();
    let now = OffsetDateTime::now_utc();
    match command {
        BookingsSubcommand::List => print_json(&bookings.mine().await?),
        BookingsSubcommand::Quote(args) => print_json(&bookings.quote(&args.request(None), now).await?),
        BookingsSubcommand::Create { booking, notes } => {
            print_json(&bookings.create(&booking.request(notes), now).await?)
        }
        BookingsSubcommand::Cancel { id } => print_json(&bookings.cancel(id, now).await?),
    }
}

async fn run_rentals(app: &App, command: RentalsSubcommand) -> Result<(), CliError> {
    require(app, Area::Client)?;
    let rentals = app.rentals();
    let today = OffsetDateTime::now_utc().date();
    match command {
        RentalsSubcommand::List => {
            let described = rentals.mine().await?.iter().map(describe_rental).collect::<Result<Vec<_>, _>>()?;
            print_json(&described)
        }
        RentalsSubcommand::Create { space_id, start, months, auto_renewal, policy } => {
            let request =
                RentalRequest { space_id, start_date: start, months, auto_renewal, cancellation_policy: policy };
            print_json(&rentals.create(&request, today).await?)
        }
        RentalsSubcommand::Cancel { id, confirm } => {
            let quote = rentals.cancellation_quote(id, today).await?;
            if !confirm {
                return print_json(&quote);
            }
            let rental = rentals.cancel(id).await?;
            print_json(&json!({ "rental": rental, "quote": quote }))
        }
        RentalsSubcommand::AutoRenewal { id, enabled } => print_json(&rentals.set_auto_renewal(id, enabled).await?),
    }
}

async fn run_invoices(app: &App, command: InvoicesSubcommand) -> Result<(), CliError> {
    require(app, Area::Client)?;
    let invoices = app.invoices();
    match command {
        InvoicesSubcommand::List => print_json(&invoices.mine().await?),
        InvoicesSubcommand::Show { id } => print_json(&invoices.get(id).await?),
        InvoicesSubcommand::Pay { id } => print_json(&invoices.pay(id, &app.payments).await?),
        InvoicesSubcommand::Return { id, query } => {
            let outcome = invoices.complete_return(id, &query, &app.payments)?;
            print_json(&json!({ "invoiceId": id, "outcome": outcome }))
        }
    }
}

async fn run_profile(app: &App, command: ProfileSubcommand) -> Result<(), CliError> {
    require(app, Area::Profile)?;
    let profile = app.profile();
    match command {
        ProfileSubcommand::Show => print_json(&profile.overview().await?),
        ProfileSubcommand::SetPersonal { first_name, last_name, document_type, document_number, phone, birth_date } => {
            let data = PersonalData { first_name, last_name, document_type, document_number, phone, birth_date };
            print_json(&profile.save_personal_data(&data).await?)
        }
        ProfileSubcommand::AddAddress { street, number, city, province, postal_code, country } => {
            let address = Address { id: None, street, number, city, province, postal_code, country };
            print_json(&profile.add_address(&address).await?)
        }
        ProfileSubcommand::DeleteAddress { id } => {
            profile.delete_address(id).await?;
            print_json(&json!({ "deleted": id }))
        }
        ProfileSubcommand::SetRole { role } => print_json(&describe_record(&app.auth().select_role(role).await?)),
    }
}

async fn run_dashboard(app: &App) -> Result<(), CliError> {
    let role = app.bridge.current_role();
    require(app, dashboard_area(role))?;
    let Some(dashboard) = app.dashboard().for_role(role).await? else {
        return print_json(&Value::Null);
    };
    let chart = series(&dashboard, OffsetDateTime::now_utc().date());
    print_json(&json!({ "dashboard": dashboard, "chart": chart, "total": chart.total() }))
}

// =============================================================================
// HELPERS
// =============================================================================

fn dashboard_area(role: Role) -> Area {
    match role {
        Role::Admin => Area::Admin,
        Role::Proveedor => Area::Provider,
        Role::Cliente | Role::Default => Area::Client,
    }
}

/// Apply the route guard for `area` to the current session.
fn require(app: &App, area: Area) -> Result<(), CliError> {
    match decide(&app.bridge.snapshot(), area) {
        Access::Allow => Ok(()),
        Access::Redirect(path) => {
            eprintln!("{}", route_hint(path));
            Err(CliError::Redirect(path))
        }
    }
}

/// The record without its tokens.
fn describe_record(record: &SessionRecord) -> Value {
    json!({
        "uid": record.uid,
        "email": record.email,
        "emailVerified": record.email_verified,
        "role": record.role,
        "home": record.role.home_path(),
    })
}

/// The rental as sent by the backend, plus where the next renewal would end.
fn describe_rental(rental: &Rental) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(rental)?;
    if let Value::Object(fields) = &mut value {
        fields.insert("renewalEnd".to_owned(), serde_json::to_value(rental.renewal_end())?);
    }
    Ok(value)
}

fn describe_state(state: &SessionState) -> Value {
    match state {
        SessionState::Anonymous => json!({ "state": "anonymous" }),
        SessionState::Rehydrating => json!({ "state": "rehydrating" }),
        SessionState::Expired => json!({ "state": "expired" }),
        SessionState::Authenticated(record) => json!({ "state": "authenticated", "user": describe_record(record) }),
        SessionState::Refreshing(record) => json!({ "state": "refreshing", "user": describe_record(record) }),
    }
}

fn parse_role(raw: &str) -> Result<Role, String> {
    match Role::parse(raw) {
        Role::Default => Err(format!("unknown role '{raw}' (expected cliente, proveedor or admin)")),
        role => Ok(role),
    }
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| e.to_string())
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "commands_test.rs"]
mod tests;
