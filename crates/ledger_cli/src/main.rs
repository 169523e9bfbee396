//! Ledger demo entry point.
//!
//! # Responsibility
//! - Seed accounts and run the transfer walkthrough (default command).
//! - Seed a small blog and show counter maintenance and associative queries.
//! - Print the accounts and audit log of an existing database.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::db::{open_db, open_db_in_memory};
use ledger_core::{
    init_logging, Account, BlogService, LedgerStore, LoggingConfig, PostDetail, TransactionRecord,
    TransferEngine, UserPosts,
};
use log::info;
use rusqlite::Connection;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "ledger",
    version,
    about = "Atomic account transfers with an append-only audit log"
)]
struct Cli {
    /// SQLite database file; an in-memory database is used when omitted
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files (or LEDGER_LOG_DIR)
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error (or LEDGER_LOG_LEVEL)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Print records as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Seed two accounts, transfer between them, then attempt an overdraft
    Transfer,
    /// Seed users, posts and comments and show the derived counters
    ///
    /// Users are reused when the database already has them; each run adds
    /// new posts and comments.
    Blog,
    /// Print accounts and the transaction log of an existing database
    Audit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config) = LoggingConfig::resolve(cli.log_level.as_deref(), cli.log_dir.as_deref())
        .context("invalid logging configuration")?
    {
        init_logging(&config).context("failed to initialize logging")?;
    }

    let command = cli.command.unwrap_or(Commands::Transfer);
    if let Commands::Audit = command {
        ensure_existing_db(cli.db.as_deref())?;
    }

    let mut conn = match cli.db.as_ref() {
        Some(path) => open_db(path)
            .with_context(|| format!("failed to open ledger database `{}`", path.display()))?,
        None => open_db_in_memory().context("failed to open in-memory ledger database")?,
    };

    info!("event=cli_run module=cli status=start command={command:?}");
    match command {
        Commands::Transfer => run_transfer_demo(&mut conn, cli.json),
        Commands::Blog => run_blog_demo(&mut conn, cli.json),
        Commands::Audit => run_audit(&mut conn, cli.json),
    }
}

/// `open_db` creates missing files, so read-only commands check first.
fn ensure_existing_db(db: Option<&Path>) -> Result<()> {
    match db {
        None => bail!("`audit` needs an existing database; pass --db <PATH>"),
        Some(path) if !path.is_file() => {
            bail!("ledger database `{}` does not exist", path.display())
        }
        Some(_) => Ok(()),
    }
}

fn run_transfer_demo(conn: &mut Connection, json: bool) -> Result<()> {
    let mut engine = TransferEngine::try_new(conn).context("ledger schema is not ready")?;
    let (a, b) = {
        let ledger = engine.ledger();
        (
            ledger.open_account(dec!(500.00))?,
            ledger.open_account(dec!(300.00))?,
        )
    };

    println!("Balances before transfer:");
    print_accounts(&[a.clone(), b.clone()]);

    println!("\nTransferring 100.00 from account {} to account {}...", a.id, b.id);
    match engine.transfer(a.id, b.id, dec!(100.00)) {
        Ok(receipt) if json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        Ok(receipt) => println!(
            "Transfer succeeded: {} moved, audit entry #{}",
            receipt.record.amount, receipt.record.id
        ),
        Err(err) => println!("Transfer failed: {err}"),
    }

    let ledger = engine.ledger();
    println!("\nBalances after transfer:");
    print_accounts(&[ledger.get_account(a.id)?, ledger.get_account(b.id)?]);
    println!("\nTransaction log:");
    print_transactions(&ledger.list_transactions()?, json)?;

    println!(
        "\nTransferring 500.00 from account {} to account {} (insufficient funds)...",
        b.id, a.id
    );
    match engine.transfer(b.id, a.id, dec!(500.00)) {
        Ok(receipt) => println!(
            "Transfer unexpectedly succeeded: audit entry #{}",
            receipt.record.id
        ),
        Err(err) => println!("Transfer failed: {err}"),
    }

    Ok(())
}

fn run_audit(conn: &mut Connection, json: bool) -> Result<()> {
    let engine = TransferEngine::try_new(conn).context("ledger schema is not ready")?;
    let ledger = engine.ledger();
    let accounts = ledger.list_accounts()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
    } else {
        println!("Accounts:");
        print_accounts(&accounts);
    }
    println!("\nTransaction log:");
    print_transactions(&ledger.list_transactions()?, json)
}

fn run_blog_demo(conn: &mut Connection, json: bool) -> Result<()> {
    let mut blog = BlogService::try_new(conn).context("blog schema is not ready")?;

    let alice = blog.find_or_register_user("alice", "alice@example.com", "Alice")?;
    let bob = blog.find_or_register_user("bob", "bob@example.com", "Bob")?;

    let intro = blog.publish_post(alice.id, "ORM basics", "Mapping rows to structs.")?;
    let practices = blog.publish_post(alice.id, "Rust practices", "Errors, modules, tests.")?;
    let services = blog.publish_post(bob.id, "Service design", "Boundaries and ownership.")?;

    blog.add_comment(intro.id, bob.id, "Learned a lot, thanks!")?;
    blog.add_comment(intro.id, bob.id, "Looking forward to more.")?;
    blog.add_comment(practices.id, bob.id, "Agreed on error handling.")?;
    blog.add_comment(services.id, alice.id, "Practical advice.")?;

    println!("Posts by alice with comments:");
    print_user_posts(&blog.user_posts_with_comments("alice")?, json)?;

    println!("\nMost commented post:");
    match blog.most_commented_post()? {
        Some(detail) => print_post_detail(&detail, json)?,
        None => println!("  (no comments yet)"),
    }

    println!("\nPublishing one more post for alice...");
    let before = blog.get_user(alice.id)?.post_count;
    blog.publish_post(alice.id, "Explicit counters", "No hidden hooks.")?;
    let after = blog.get_user(alice.id)?.post_count;
    println!("  alice post_count: {before} -> {after}");

    println!("\nDeleting the only comment on a fresh post...");
    let lonely = blog.publish_post(bob.id, "Quiet post", "One comment only.")?;
    let comment = blog.add_comment(lonely.id, bob.id, "The only comment.")?;
    println!(
        "  status before: {}",
        blog.get_post(lonely.id)?.comment_status.as_str()
    );
    let deletion = blog.delete_comment(comment.id)?;
    println!(
        "  status after: {} (remaining comments: {})",
        deletion.post_status.as_str(),
        deletion.remaining_comments
    );

    Ok(())
}

fn print_accounts(accounts: &[Account]) {
    for account in accounts {
        println!("  account {}: {}", account.id, account.balance);
    }
}

fn print_transactions(records: &[TransactionRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("  (empty)");
    }
    for record in records {
        println!(
            "  #{}: account {} -> account {}: {}",
            record.id, record.from_account_id, record.to_account_id, record.amount
        );
    }
    Ok(())
}

fn print_user_posts(view: &UserPosts, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }
    println!(
        "  {} ({}), post_count={}",
        view.user.username, view.user.nickname, view.user.post_count
    );
    for (index, entry) in view.posts.iter().enumerate() {
        println!(
            "  [{}] {} ({}, {} comments)",
            index + 1,
            entry.post.title,
            entry.post.comment_status.as_str(),
            entry.comments.len()
        );
        for comment in &entry.comments {
            println!(
                "      {}: {}",
                comment.author_username, comment.comment.content
            );
        }
    }
    Ok(())
}

fn print_post_detail(detail: &PostDetail, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(detail)?);
        return Ok(());
    }
    println!(
        "  #{} {} by {} ({} comments)",
        detail.post.id,
        detail.post.title,
        detail.author_username,
        detail.comment_count()
    );
    for comment in &detail.comments {
        println!(
            "      {}: {}",
            comment.author_username, comment.comment.content
        );
    }
    Ok(())
}
