use std::path::{Path, PathBuf};

use access_controller::{
    attach_storage, journal_storage, load_controller, save_controller, AccessController,
};
use access_provider::{Identity, MembershipController, RoleId, RoleRegistry};
use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use common_utils::Logged;
use log::{debug, info};
use serde_json::{json, Value};

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Opt {
    /// State snapshot file
    #[clap(long, env = "ACCESS_STATE_PATH", default_value = "./access-state.json")]
    pub state: PathBuf,

    /// Identity performing the write operation
    #[clap(long, env = "ACCESS_CALLER")]
    pub caller: Option<String>,

    /// True to append committed events to the journal at `ACCESS_JOURNAL_PATH`
    #[clap(long)]
    pub write_journal: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Create a new state owned by `owner`
    Init {
        #[clap(long)]
        owner: String,

        /// Overwrite an existing state file
        #[clap(long)]
        force: bool,
    },
    #[clap(flatten)]
    Operation(Operation),
}

#[derive(Subcommand, Clone, Debug)]
pub enum Operation {
    /// Register a role name, owner only
    AddRole { name: String },
    /// Remove a role name, owner only
    RemoveRole { name: String },
    /// Grant a role (name or identifier) to an account
    Grant { role: String, account: String },
    /// Revoke a role (name or identifier) from an account
    Revoke { role: String, account: String },
    /// Give up a role held by the caller
    Renounce { role: String },
    /// Check whether an account holds a role
    HasRole { role: String, account: String },
    /// List the accounts holding a role
    Members { role: String },
    /// Identifier of a registered role name
    RoleId { name: String },
    /// Admin role of a role
    RoleAdmin { role: String },
    /// List registered role names
    Roles,
    /// Show the owner
    Owner,
}

impl Operation {
    fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::AddRole { .. }
                | Operation::RemoveRole { .. }
                | Operation::Grant { .. }
                | Operation::Revoke { .. }
                | Operation::Renounce { .. }
        )
    }
}

fn caller(options: &Opt) -> anyhow::Result<Identity> {
    let caller = options
        .caller
        .as_deref()
        .ok_or_else(|| anyhow!("Caller must be specified for write operations"))?;
    Ok(caller.parse()?)
}

fn role_json(controller: &AccessController, role: &RoleId) -> Value {
    json!({
        "role": role,
        "admin": controller.get_role_admin(role),
    })
}

/**
 * Save the state first, journal records staged by the controller are appended only after that
 * Returns the committed events
 */
async fn commit(controller: &mut AccessController, state: &Path) -> anyhow::Result<Vec<Value>> {
    let events = controller.take_events();
    if events.is_empty() {
        debug!("Nothing changed");
        return Ok(vec![]);
    }
    // On failure the staged records are dropped along with the controller
    save_controller(controller, state).await?;
    controller.commit_storage().await?;
    Ok(events
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?)
}

async fn init(options: &Opt, owner: &str, force: bool) -> anyhow::Result<Vec<Value>> {
    if !force && options.state.exists() {
        bail!(
            "State file '{}' already exists",
            options.state.to_string_lossy()
        );
    }
    let external_storage = if options.write_journal {
        journal_storage().into_iter().collect()
    } else {
        vec![]
    };
    let mut controller = AccessController::with_storage(owner.parse()?, external_storage).await?;
    let events = commit(&mut controller, &options.state).await?;
    info!("State initialized at '{}'", options.state.to_string_lossy());
    Ok(events)
}

async fn execute(options: &Opt, operation: &Operation) -> anyhow::Result<Vec<Value>> {
    let mut controller = load_controller(&options.state).await?;
    if options.write_journal {
        attach_storage(&mut controller);
    }

    let output = match operation {
        Operation::AddRole { name } => {
            controller.add_role(&caller(options)?, name).await?;
            vec![]
        }
        Operation::RemoveRole { name } => {
            controller.remove_role(&caller(options)?, name).await?;
            vec![]
        }
        Operation::Grant { role, account } => {
            let role = controller.role_id_by_name_or_id(role);
            controller
                .grant_role_by_id(&caller(options)?, role, account.parse()?)
                .await?;
            vec![]
        }
        Operation::Revoke { role, account } => {
            let role = controller.role_id_by_name_or_id(role);
            controller
                .revoke_role_by_id(&caller(options)?, role, account.parse()?)
                .await?;
            vec![]
        }
        Operation::Renounce { role } => {
            let role = controller.role_id_by_name_or_id(role);
            controller.renounce_role_by_id(&caller(options)?, role).await?;
            vec![]
        }
        Operation::HasRole { role, account } => {
            let role = controller.role_id_by_name_or_id(role);
            vec![json!(controller.has_role_by_id(&role, &account.parse()?))]
        }
        Operation::Members { role } => {
            let role = controller.role_id_by_name_or_id(role);
            controller
                .role_members(&role)
                .into_iter()
                .map(|m| json!(m))
                .collect()
        }
        Operation::RoleId { name } => vec![json!(controller.role_bytes_by_role_name(name))],
        Operation::RoleAdmin { role } => {
            let role = controller.role_id_by_name_or_id(role);
            vec![role_json(&controller, &role)]
        }
        Operation::Roles => controller
            .role_names()
            .into_iter()
            .map(|name| {
                let role = controller.role_bytes_by_role_name(&name);
                let mut v = role_json(&controller, &role);
                v["name"] = json!(name);
                v
            })
            .collect(),
        Operation::Owner => vec![json!(controller.owner())],
    };

    if operation.is_write() {
        return commit(&mut controller, &options.state).await;
    }
    Ok(output)
}

/**
 * Execute one command, returns the lines to print
 */
pub async fn run(options: &Opt) -> anyhow::Result<Vec<Value>> {
    match &options.command {
        Command::Init { owner, force } => init(options, owner, *force).await,
        Command::Operation(operation) => execute(options, operation).await,
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    common_utils::init_logger();

    // Parse the parameters passed by arguments.
    let options = Opt::parse();

    for line in run(&options).await.log()? {
        println!("{}", line);
    }
    Ok(())
}
