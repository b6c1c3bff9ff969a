use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use cobuild_client::api::client::ApiClient;
use cobuild_client::api::models::{RegisterRequest, Role, User};
use cobuild_client::app::AppConfig;
use cobuild_client::chat::display;
use cobuild_client::chat::{Composer, ConversationState, ConversationView, InboxView, SendOutcome};
use cobuild_client::error::ViewError;
use cobuild_client::routes::{Guard, Route, dashboard_route, guard};
use cobuild_client::session::{Session, TokenStore};
use cobuild_client::utils::{RUNTIME, init_logging};

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }
    RUNTIME.block_on(run(args))
}

fn print_usage() {
    println!("CoBuild messaging client");
    println!();
    println!("Usage: cobuild <command> [args]");
    println!();
    println!("Commands:");
    println!("  login <username> <password>                  Sign in and remember the session");
    println!("  register <username> <email> <password> <role> Create an account (role: worker, owner, supplier, admin)");
    println!("  logout                                       Forget the stored session");
    println!("  whoami                                       Show the signed-in user and their menu");
    println!("  inbox                                        List conversations");
    println!("  new <username>                               Start a conversation and open it");
    println!("  chat <username>                              Open a conversation (/retry resends, /quit leaves)");
}

struct Host {
    config: AppConfig,
    client: Arc<ApiClient>,
    session: Session,
}

async fn run(args: Vec<String>) -> Result<()> {
    let config = AppConfig::load();
    let client = Arc::new(ApiClient::new(&config.base_url, config.request_timeout())?);
    let session = Session::new(client.clone(), TokenStore::persistent(config.clone(), None));
    session.init().await;
    let host = Host { config, client, session };

    match args[1].as_str() {
        "login" => {
            let [_, _, username, password, ..] = args.as_slice() else {
                bail!("Usage: cobuild login <username> <password>");
            };
            let user = host.session.login(username, password).await.context("Login failed")?;
            println!("Signed in as {}", user.username);
            print_menu(&user);
        }
        "register" => {
            let [_, _, username, email, password, role, ..] = args.as_slice() else {
                bail!("Usage: cobuild register <username> <email> <password> <role>");
            };
            let role = Role::parse(role).with_context(|| format!("Unknown role {role}"))?;
            let data = RegisterRequest {
                username: username.clone(),
                email: email.clone(),
                password: password.clone(),
                role_name: role,
            };
            host.session.register(&data).await.context("Registration failed")?;
            println!("Account created, you can now log in.");
        }
        "logout" => {
            host.session.logout();
            println!("Signed out.");
        }
        "whoami" => match host.session.current_user() {
            Some(user) => {
                println!("{} <{}>", user.username, user.email);
                print_menu(&user);
            }
            None => println!("Not signed in."),
        },
        "inbox" => {
            let me = host.require(&Route::Inbox)?;
            show_inbox(&host, &me).await;
        }
        "new" => {
            let target = args.get(2).context("Usage: cobuild new <username>")?;
            let me = host.require(&Route::Inbox)?;
            let inbox = InboxView::new(host.client.clone(), me.id.clone());
            match inbox.start_conversation(target).await {
                Ok(Some(Route::Conversation(username))) => chat(&host, &me, username).await?,
                Ok(_) => bail!("Enter a username to start a conversation"),
                Err(e) => bail!("{e}"),
            }
        }
        "chat" => {
            let username = args.get(2).context("Usage: cobuild chat <username>")?.clone();
            let me = host.require(&Route::Conversation(username.clone()))?;
            chat(&host, &me, username).await?;
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
        }
    }
    Ok(())
}

impl Host {
    fn require(&self, route: &Route) -> Result<User> {
        match guard(route, &self.session.snapshot()) {
            Guard::Allow => self.session.current_user().context("Not signed in"),
            Guard::Pending => bail!("Session is still loading"),
            Guard::Redirect(to) => {
                let hint = self.session.snapshot().error.unwrap_or_else(|| "Not signed in".to_string());
                bail!("{hint}; continue at {} (try `cobuild login`)", to.path())
            }
        }
    }

    fn asset_base(&self) -> Option<Url> {
        Url::parse(&self.config.asset_base_url).ok()
    }
}

fn print_menu(user: &User) {
    let Route::Dashboard(role) = dashboard_route(Some(user)) else {
        println!("No role assigned.");
        return;
    };
    let config = role.view_config();
    println!("Dashboard: {}", config.base_path);
    for item in config.menu {
        println!("  {:<14} {}", item.label, item.path);
    }
}

async fn show_inbox(host: &Host, me: &User) {
    let inbox = InboxView::new(host.client.clone(), me.id.clone());
    inbox.load().await;
    let state = inbox.snapshot();
    if let Some(err) = &state.error {
        eprintln!("! {err}");
        return;
    }
    if state.entries.is_empty() {
        println!("No messages yet. Start a conversation with `cobuild new <username>`.");
        return;
    }
    let now = Utc::now();
    for entry in &state.entries {
        println!(
            "{:<16} {:>22}  {}",
            entry.counterpart.username,
            display::relative_time(entry.last_message.timestamp, now),
            entry.preview()
        );
    }
}

struct Renderer {
    me: String,
    counterpart: String,
    asset_base: Option<Url>,
    printed: HashSet<String>,
    header_shown: bool,
}

impl Renderer {
    fn render(&mut self, state: &ConversationState) {
        if state.loading {
            return;
        }
        if !self.header_shown {
            let title = display::conversation_title(&state.messages, &self.me, &self.counterpart);
            let avatar = display::counterpart_of(&state.messages, &self.me)
                .zip(self.asset_base.as_ref())
                .and_then(|(u, base)| display::avatar_url(base, u.profile_picture_url.as_deref()));
            match avatar {
                Some(url) => println!("== {title} ({url}) =="),
                None => println!("== {title} =="),
            }
            self.header_shown = true;
        }
        let now = Utc::now();
        for message in &state.messages {
            if !self.printed.insert(message.id.clone()) {
                continue;
            }
            let who = if display::is_own(message, &self.me) { "you" } else { message.sender.username.as_str() };
            let when = display::relative_time(message.timestamp, now);
            if message.content.is_empty() {
                println!("  [{when}] {who} opened the conversation");
            } else {
                println!("  [{when}] {who}: {}", message.content);
            }
        }
        if let Some(err) = &state.error {
            eprintln!("! {err}");
        }
    }
}

// the error banner itself is printed by the next render
async fn submit(composer: &Composer<ApiClient>) {
    let outcome = composer.submit().await;
    if let Some(notice) = kept_draft_notice(&outcome, &composer.draft()) {
        eprintln!("{notice}");
    }
}

fn kept_draft_notice(outcome: &Result<SendOutcome, ViewError>, draft: &str) -> Option<String> {
    match outcome {
        Err(_) | Ok(SendOutcome::Unconfirmed(_)) if !draft.trim().is_empty() => {
            Some(format!("  draft kept: \"{}\" (type /retry to send it again)", draft.trim()))
        }
        _ => None,
    }
}

async fn chat(host: &Host, me: &User, username: String) -> Result<()> {
    let view = ConversationView::mount(host.client.clone(), Some(username.clone()), host.config.poll_interval());
    let composer = view.composer();
    let mut updates = view.subscribe();
    let mut renderer = Renderer {
        me: me.id.clone(),
        counterpart: username.clone(),
        asset_base: host.asset_base(),
        printed: HashSet::new(),
        header_shown: false,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Chatting with {username}. Type a message and press enter, /retry to resend, /quit to leave.");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                renderer.render(&state);
                view.dismiss_error();
            }
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(text) if text.trim() == "/quit" => break,
                    Some(text) if text.trim() == "/retry" => submit(&composer).await,
                    Some(text) => {
                        composer.set_draft(text);
                        submit(&composer).await;
                    }
                }
            }
        }
        if let Some(Route::Login) = host.session.take_redirect() {
            eprintln!("Session expired, please log in again.");
            break;
        }
    }
    view.unmount();
    Ok(())
}
