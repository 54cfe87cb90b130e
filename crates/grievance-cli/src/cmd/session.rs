//! `grv login`, `grv logout`, `grv whoami`.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use clap::Args;
use grievance_core::auth::{Auth, Role};
use serde::Serialize;

use super::AppContext;
use crate::output::{fail, pretty_kv, render, render_mode};

pub const PASSWORD_ENV: &str = "GRIEVANCE_PASSWORD";

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email; must be listed in `[auth.users]`.
    #[arg(long, short = 'e')]
    pub email: String,

    /// Password. Falls back to GRIEVANCE_PASSWORD, then one line of stdin.
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Serialize)]
struct WhoAmI {
    logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    department: Option<String>,
}

impl WhoAmI {
    fn of(auth: &Auth) -> Self {
        Self {
            logged_in: auth.is_logged_in(),
            email: auth.user_email().map(str::to_string),
            name: auth.user_name(),
            role: auth.user_role(),
            department: auth.department().map(str::to_string),
        }
    }

    fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        if !self.logged_in {
            return writeln!(w, "Not logged in.");
        }
        pretty_kv(w, "Name", &self.name)?;
        pretty_kv(w, "Email", self.email.as_deref().unwrap_or_default())?;
        pretty_kv(
            w,
            "Role",
            match self.role {
                Some(Role::Admin) => "Admin",
                Some(Role::Assignee) => "PIC",
                None => "-",
            },
        )?;
        pretty_kv(w, "Department", self.department.as_deref().unwrap_or("-"))
    }
}

fn read_password(args: &LoginArgs) -> Result<String> {
    if let Some(password) = &args.password {
        return Ok(password.clone());
    }
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn run_login(args: &LoginArgs, ctx: &AppContext) -> Result<()> {
    let password = read_password(args)?;
    let mut tracker = ctx.tracker()?;
    let auth = tracker.auth_mut();
    auth.sign_in(&args.email, &password)
        .map_err(|err| fail(ctx.output, err))?;

    render_mode(
        ctx.output,
        &WhoAmI::of(auth),
        |who, w| writeln!(w, "{}", who.email.as_deref().unwrap_or_default()),
        |who, w| {
            writeln!(w, "✓ welcome, {}", who.name)?;
            who.write_pretty(w)
        },
    )
}

pub fn run_logout(ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.tracker()?;
    let was_logged_in = tracker.auth().is_logged_in();
    tracker.auth_mut().sign_out();

    render(
        ctx.output,
        &serde_json::json!({ "logged_out": was_logged_in }),
        |_, w| {
            if was_logged_in {
                writeln!(w, "✓ logged out")
            } else {
                writeln!(w, "Not logged in.")
            }
        },
    )
}

pub fn run_whoami(ctx: &AppContext) -> Result<()> {
    let tracker = ctx.tracker()?;
    render_mode(
        ctx.output,
        &WhoAmI::of(tracker.auth()),
        |who, w| {
            writeln!(
                w,
                "{}\t{}\t{}",
                who.email.as_deref().unwrap_or("-"),
                who.role.map_or("-", Role::as_str),
                who.name
            )
        },
        |who, w| who.write_pretty(w),
    )
}
