use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use staffgauge::{
    BulkReport, Dashboard, InvitationType, MemberOrder, MemberPatch, NewMember, Project, Role,
    StaffGauge, TimeRange,
};

#[derive(Parser)]
#[command(name = "staffgauge", about = "Team utilization and capacity dashboard")]
struct Cli {
    /// Database path (default: ~/.staffgauge/staffgauge.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Company to report on (default: the company_id config value)
    #[arg(long)]
    company: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-member utilization for a time range
    Utilization {
        /// Report one member or pending invite, summed from the allocation store
        #[arg(long)]
        member: Option<String>,
        /// Time range: week, month, 3months, 4months, 6months, year
        #[arg(long, default_value = "month")]
        range: String,
        /// Only people and projects in this office (location code)
        #[arg(long)]
        office: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Team summary and status badges
    Summary {
        #[arg(long, default_value = "month")]
        range: String,
        /// Only people and projects in this office (location code)
        #[arg(long)]
        office: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Ranked staffing insights
    Insights {
        #[arg(long, default_value = "month")]
        range: String,
        /// Only people and projects in this office (location code)
        #[arg(long)]
        office: Option<String>,
        /// Skip the AI service and use the local generators
        #[arg(long)]
        local: bool,
        /// Ignore cached AI insights
        #[arg(long)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Weekly workload heat map
    Workload {
        #[arg(long, default_value = "month")]
        range: String,
        /// Only people and projects in this office (location code)
        #[arg(long)]
        office: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Project counts and booked hours by status and location
    Projects {
        #[arg(long, default_value = "month")]
        range: String,
        /// Only people and projects in this office (location code)
        #[arg(long)]
        office: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Manage team members and invites
    Members {
        #[command(subcommand)]
        action: MembersAction,
    },
    /// Manage office holidays
    Holidays {
        #[command(subcommand)]
        action: HolidaysAction,
    },
    /// Manage office reference data
    Offices {
        #[command(subcommand)]
        action: OfficesAction,
    },
    /// Book hours against projects
    Allocations {
        #[command(subcommand)]
        action: AllocationsAction,
    },
    /// Add or update a project
    ProjectsAdd {
        /// Project id
        id: String,
        /// Project name
        name: String,
        /// Status: Planning, Active, On Hold, Complete
        #[arg(long, default_value = "Active")]
        status: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        stage: Option<String>,
        /// Office location code
        #[arg(long)]
        location: Option<String>,
        /// Project manager member id
        #[arg(long)]
        pm: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show row counts for the current company
    Status,
}

#[derive(Args)]
struct MemberFields {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    /// Weekly capacity override in hours
    #[arg(long)]
    capacity: Option<f64>,
    #[arg(long)]
    department: Option<String>,
    /// Office location code
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    job_title: Option<String>,
}

#[derive(Subcommand)]
enum MembersAction {
    /// List members and pending invites
    List {
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Filter by role: member, admin, owner
        #[arg(long)]
        role: Option<String>,
        /// Match name or email
        #[arg(long)]
        search: Option<String>,
        /// Hide pending invites
        #[arg(long)]
        no_pending: bool,
        /// Sort by: name, department, location, capacity
        #[arg(long, default_value = "name")]
        order_by: String,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        csv: bool,
        /// Count only (no output rows)
        #[arg(long)]
        count: bool,
    },
    /// Add a registered member
    Add {
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        capacity: Option<f64>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        job_title: Option<String>,
        #[arg(long, default_value = "member")]
        role: String,
    },
    /// Invite someone by email, or pre-register them without one
    Invite {
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        email: Option<String>,
        /// Pre-register without sending an invite
        #[arg(long)]
        pre_registered: bool,
        #[arg(long)]
        capacity: Option<f64>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        job_title: Option<String>,
    },
    /// Edit a member or pending invite
    Edit {
        id: String,
        #[command(flatten)]
        fields: MemberFields,
        #[arg(long)]
        role: Option<String>,
    },
    /// Delete a member
    Delete { id: String },
    /// Cancel a pending invite
    CancelInvite { id: String },
    /// Delete several members or invites
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Apply the same change to several members or invites
    BulkUpdate {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        capacity: Option<f64>,
    },
    /// Import a JSON roster file as pre-registered invites
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum HolidaysAction {
    /// Add a holiday (YYYY-MM-DD)
    Add {
        date: String,
        name: String,
        /// Last day of a multi-day holiday
        #[arg(long)]
        end: Option<String>,
        /// Office location code; omit for company-wide
        #[arg(long)]
        location: Option<String>,
    },
    /// List upcoming holidays
    List {
        #[arg(long, default_value = "30")]
        days: i64,
        #[arg(long)]
        json: bool,
    },
    /// Remove a holiday by id
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum OfficesAction {
    AddLocation {
        code: String,
        city: String,
        #[arg(long)]
        country: Option<String>,
    },
    AddDepartment { name: String },
    AddPracticeArea { name: String },
    /// Set the company work week in hours
    SetWorkWeek { hours: f64 },
    /// List locations, departments and practice areas
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AllocationsAction {
    /// Book hours for a member or pending invite on a date
    Add {
        project: String,
        resource: String,
        /// YYYY-MM-DD
        date: String,
        hours: f64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => staffgauge::Database::open_at(path).await?,
        None => staffgauge::Database::open().await?,
    };
    let sg = StaffGauge::open(db, cli.company.as_deref()).await?;

    match cli.command {
        Commands::Status => {
            print_status(&sg).await?;
        }
        Commands::Config { action } => {
            handle_config(&sg, action).await?;
        }
        Commands::Utilization {
            member: Some(id),
            range,
            json,
            ..
        } => {
            let result = sg.member_utilization(&id, TimeRange::parse(&range)?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "{}: {}% ({:.1}h / {:.1}h)",
                    result.member_name,
                    result.rounded_rate(),
                    result.total_allocated_hours,
                    result.period_capacity_hours
                );
            }
        }
        Commands::Utilization {
            member: None,
            range,
            office,
            json,
        } => {
            let dash = sg.dashboard(TimeRange::parse(&range)?, office.as_deref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&dash.members)?);
            } else if !print_unavailable(&dash) {
                print_utilization(&dash);
            }
        }
        Commands::Summary { range, office, json } => {
            let dash = sg.dashboard(TimeRange::parse(&range)?, office.as_deref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&dash)?);
            } else if !print_unavailable(&dash) {
                print_summary(&dash);
            }
        }
        Commands::Insights {
            range,
            office,
            local,
            force,
            json,
        } => {
            let report = sg
                .insights(TimeRange::parse(&range)?, office.as_deref(), local, force)
                .await;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "source": report.source, "insights": report.items })
                );
            } else {
                if let Some(ref err) = report.dashboard.load_error {
                    println!("Unable to Load: {err}");
                }
                println!("Insights ({})", report.source.as_str());
                for item in &report.items {
                    let metric = item.metric.as_deref().map(|m| format!(" [{m}]")).unwrap_or_default();
                    println!("  [{}] {}{metric}", item.severity.as_str(), item.title);
                    println!("      {}", item.description);
                }
            }
        }
        Commands::Workload { range, office, json } => {
            let report = sg.workload(TimeRange::parse(&range)?, office.as_deref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if let Some(ref err) = report.load_error {
                println!("Unable to Load: {err}");
            } else {
                print_workload(&report.rows);
            }
        }
        Commands::Projects { range, office, json } => {
            let dash = sg.dashboard(TimeRange::parse(&range)?, office.as_deref()).await;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "active_project_count": dash.active_project_count,
                        "by_status": dash.projects_by_status,
                        "by_location": dash.projects_by_location,
                    })
                );
            } else if let Some(ref err) = dash.load_error {
                println!("Unable to Load: {err}");
            } else if dash.projects_by_status.is_empty() {
                println!("No Data Available");
            } else {
                println!("Active projects: {}", dash.active_project_count);
                println!("By status:");
                for g in &dash.projects_by_status {
                    println!("  {:<12} {:>3} projects {:>8.1}h", g.key, g.project_count, g.allocated_hours);
                }
                println!("By location:");
                for g in &dash.projects_by_location {
                    println!("  {:<12} {:>3} projects {:>8.1}h", g.key, g.project_count, g.allocated_hours);
                }
            }
        }
        Commands::Members { action } => {
            handle_members(&sg, action).await?;
        }
        Commands::Holidays { action } => {
            handle_holidays(&sg, action).await?;
        }
        Commands::Offices { action } => {
            handle_offices(&sg, action).await?;
        }
        Commands::Allocations { action } => match action {
            AllocationsAction::Add {
                project,
                resource,
                date,
                hours,
            } => {
                let id = sg
                    .add_allocation(&project, &resource, parse_date(&date)?, hours)
                    .await?;
                println!("Allocation {id} added.");
            }
        },
        Commands::ProjectsAdd {
            id,
            name,
            status,
            code,
            stage,
            location,
            pm,
        } => {
            sg.add_project(Project {
                id: id.clone(),
                company_id: sg.company_id().to_string(),
                code,
                name,
                status,
                stage,
                location,
                pm_id: pm,
            })
            .await?;
            println!("Project {id} saved.");
        }
    }

    Ok(())
}

/// Prints the degraded/empty message if there is nothing to show.
fn print_unavailable(dash: &Dashboard) -> bool {
    if let Some(ref err) = dash.load_error {
        println!("Unable to Load: {err}");
        true
    } else if dash.is_empty() {
        println!("No Data Available");
        true
    } else {
        false
    }
}

fn print_utilization(dash: &Dashboard) {
    let office = dash.office.as_deref().map(|o| format!(", {o}")).unwrap_or_default();
    println!(
        "Utilization: {} ({} to {}, {} days{office})",
        dash.range.range,
        dash.range.start,
        dash.range.end,
        dash.range.day_count()
    );
    for m in &dash.members {
        let pending = if m.is_pending { " (pending)" } else { "" };
        println!(
            "  {:<28} {:>4}%  {:>7.1}h / {:>7.1}h{pending}",
            m.member_name,
            m.rounded_rate(),
            m.total_allocated_hours,
            m.period_capacity_hours
        );
    }
}

fn print_summary(dash: &Dashboard) {
    let s = &dash.summary;
    let st = &dash.status;
    println!("Team Summary: {}", dash.range.range);
    println!("  Members:     {} ({} pending)", s.member_count, dash.pending_count);
    println!(
        "  Utilization: {:.0}% [{}]",
        s.team_utilization_rate, st.utilization.label
    );
    println!("    Mean:      {:.1}%", s.mean_utilization_rate);
    println!("    Weighted:  {:.1}%", s.weighted_utilization_rate);
    println!("  Overloaded:  {}", s.overloaded_count);
    println!("  Under 50%:   {}", s.underutilized_count);
    println!(
        "  Capacity:    {:.0}h booked of {:.0}h ({})",
        s.total_allocated_hours,
        s.total_capacity_hours,
        s.capacity_gap_display()
    );
    println!(
        "  Buffer:      {:.0}% [{}]",
        s.capacity_buffer_pct, st.capacity_buffer.label
    );
    println!(
        "  Projects:    {} active, {:.1} per person [{}]",
        dash.active_project_count, st.projects_per_person, st.project_load.label
    );
}

fn print_workload(rows: &[staffgauge::WorkloadRow]) {
    let Some(first) = rows.first() else {
        println!("No Data Available");
        return;
    };
    let header: Vec<String> = first
        .weeks
        .iter()
        .map(|c| format!("{:>6}", c.week_start.format("%m-%d")))
        .collect();
    println!("{:<28}{}", "", header.join(""));
    for row in rows {
        let cells: Vec<String> = row
            .weeks
            .iter()
            .map(|c| {
                let mark = if c.intensity > 1.0 { "*" } else { " " };
                format!("{:>5.0}{mark}", c.hours)
            })
            .collect();
        println!("{:<28}{}", row.member_name, cells.join(""));
    }
    println!("\n* over weekly capacity");
}

fn print_bulk_report(report: &BulkReport) {
    println!("{} ({:?})", report.summary(), report.status);
    for (item, err) in &report.failures {
        println!("  {item}: {err}");
    }
}

async fn print_status(sg: &StaffGauge) -> anyhow::Result<()> {
    let counts = sg.status().await?;
    println!("Status: {}", sg.company_id());
    for (table, n) in counts {
        println!("  {table:<30} {n}");
    }
    Ok(())
}

async fn handle_config(sg: &StaffGauge, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match sg.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            sg.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = sg.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

async fn handle_members(sg: &StaffGauge, action: MembersAction) -> anyhow::Result<()> {
    match action {
        MembersAction::List {
            department,
            location,
            role,
            search,
            no_pending,
            order_by,
            desc,
            limit,
            json,
            csv,
            count,
        } => {
            let mut builder = sg
                .members()
                .include_pending(!no_pending)
                .order_by(MemberOrder::parse(&order_by)?);
            if let Some(d) = department {
                builder = builder.department(&d);
            }
            if let Some(l) = location {
                builder = builder.location(&l);
            }
            if let Some(r) = role {
                builder = builder.role(&r);
            }
            if let Some(s) = search {
                builder = builder.search(&s);
            }
            if let Some(n) = limit {
                builder = builder.limit(n);
            }
            if desc {
                builder = builder.descending();
            }

            if count {
                println!("{}", builder.count(sg.db()).await?);
            } else if json {
                println!("{}", builder.to_json(sg.db()).await?);
            } else if csv {
                print!("{}", builder.to_csv(sg.db()).await?);
            } else {
                let rows = builder.rows(sg.db()).await?;
                if rows.is_empty() {
                    println!("No members found.");
                } else {
                    for row in &rows {
                        let name = format!("{} {}", row.first_name, row.last_name);
                        let tag = if row.is_pending {
                            "pending".to_string()
                        } else {
                            row.role.clone().unwrap_or_default()
                        };
                        let capacity = row
                            .weekly_capacity
                            .map_or("default".to_string(), |c| format!("{c}h"));
                        println!(
                            "{} {:<28} [{tag}] {} | {} | {capacity}",
                            row.id,
                            name.trim(),
                            row.department.as_deref().unwrap_or("-"),
                            row.location.as_deref().unwrap_or("-"),
                        );
                    }
                    println!("\n{} people", rows.len());
                }
            }
        }
        MembersAction::Add {
            first_name,
            last_name,
            email,
            capacity,
            department,
            location,
            job_title,
            role,
        } => {
            let member = sg
                .add_member(NewMember {
                    first_name,
                    last_name,
                    email,
                    weekly_capacity: capacity,
                    department,
                    location,
                    job_title,
                    role: Role::parse(&role),
                })
                .await?;
            println!("Added: {} ({})", member.id, member.first_name);
        }
        MembersAction::Invite {
            first_name,
            last_name,
            email,
            pre_registered,
            capacity,
            department,
            location,
            job_title,
        } => {
            let kind = if pre_registered {
                InvitationType::PreRegistered
            } else {
                InvitationType::EmailInvite
            };
            let pending = sg
                .invite_member(
                    NewMember {
                        first_name,
                        last_name,
                        email,
                        weekly_capacity: capacity,
                        department,
                        location,
                        job_title,
                        ..Default::default()
                    },
                    kind,
                )
                .await?;
            println!("Invited: {} ({})", pending.id, kind.as_str());
        }
        MembersAction::Edit { id, fields, role } => {
            sg.edit_member(
                &id,
                MemberPatch {
                    first_name: fields.first_name,
                    last_name: fields.last_name,
                    weekly_capacity: fields.capacity,
                    department: fields.department,
                    location: fields.location,
                    job_title: fields.job_title,
                    role: role.as_deref().map(Role::parse),
                    avatar_url: None,
                },
            )
            .await?;
            println!("Updated: {id}");
        }
        MembersAction::Delete { id } => {
            sg.delete_member(&id).await?;
            println!("Deleted: {id}");
        }
        MembersAction::CancelInvite { id } => {
            sg.cancel_invite(&id).await?;
            println!("Cancelled invite: {id}");
        }
        MembersAction::BulkDelete { ids } => {
            let report = sg.bulk_delete(&ids).await?;
            print_bulk_report(&report);
        }
        MembersAction::BulkUpdate {
            ids,
            department,
            location,
            capacity,
        } => {
            let patch = MemberPatch {
                department,
                location,
                weekly_capacity: capacity,
                ..Default::default()
            };
            let report = sg.bulk_update(&ids, &patch).await?;
            print_bulk_report(&report);
        }
        MembersAction::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", file.display()))?;
            let report = sg.import_roster(&json).await?;
            print_bulk_report(&report);
        }
    }
    Ok(())
}

async fn handle_holidays(sg: &StaffGauge, action: HolidaysAction) -> anyhow::Result<()> {
    match action {
        HolidaysAction::Add {
            date,
            name,
            end,
            location,
        } => {
            let end = end.as_deref().map(parse_date).transpose()?;
            let id = sg
                .add_holiday(parse_date(&date)?, end, &name, location.as_deref())
                .await?;
            println!("Holiday {id} added.");
        }
        HolidaysAction::List { days, json } => {
            let from = today();
            let holidays = sg.holidays(from, from + chrono::Duration::days(days)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&holidays)?);
            } else if holidays.is_empty() {
                println!("No holidays in the next {days} days.");
            } else {
                for h in &holidays {
                    let span = match h.end_date {
                        Some(end) if end != h.date => format!("{} to {end}", h.date),
                        _ => h.date.to_string(),
                    };
                    let loc = h.location.as_deref().unwrap_or("all offices");
                    println!("{:>4} {span:<24} {} ({loc})", h.id, h.name);
                }
            }
        }
        HolidaysAction::Remove { id } => {
            if sg.remove_holiday(id).await? {
                println!("Removed holiday {id}");
            } else {
                println!("Not found: {id}");
            }
        }
    }
    Ok(())
}

async fn handle_offices(sg: &StaffGauge, action: OfficesAction) -> anyhow::Result<()> {
    match action {
        OfficesAction::AddLocation { code, city, country } => {
            sg.add_location(&code, &city, country.as_deref()).await?;
            println!("Location saved.");
        }
        OfficesAction::AddDepartment { name } => {
            sg.add_department(&name).await?;
            println!("Department saved.");
        }
        OfficesAction::AddPracticeArea { name } => {
            sg.add_practice_area(&name).await?;
            println!("Practice area saved.");
        }
        OfficesAction::SetWorkWeek { hours } => {
            sg.set_work_week_hours(hours).await?;
            println!("Work week set to {hours}h.");
        }
        OfficesAction::List { json } => {
            let reference = sg.office_reference().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reference)?);
            } else {
                println!("Locations:");
                for l in &reference.locations {
                    let country = l.country.as_deref().unwrap_or("");
                    println!("  {:<6} {} {country}", l.code, l.city);
                }
                println!("Departments:");
                for d in &reference.departments {
                    println!("  {d}");
                }
                println!("Practice areas:");
                for p in &reference.practice_areas {
                    println!("  {p}");
                }
            }
        }
    }
    Ok(())
}
