use super::config::TrustDaoConfig;
use std::path::Path;
use trustdao::governance::settings::SETTING_KEYS;
use trustdao::governance::votes_required;

/// Validate a config file and print the effective governance settings
pub fn execute(config_path: String) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Checking {}...", config_path);
    println!();

    let config = TrustDaoConfig::load(Path::new(&config_path))?;
    let settings = &config.governance;
    let secs = |s: u64| humantime::format_duration(std::time::Duration::from_secs(s));

    println!("  Quorum:             {}", settings.quorum);
    println!("  Bond:               {}", settings.bond_amount);
    println!("  Minimum members:    {}", settings.min_members);
    println!("  Proposal cooldown:  {}", secs(settings.proposal_cooldown));
    println!("  Vote delay:         {}", secs(settings.vote_delay));
    println!("  Voting duration:    {}", secs(settings.voting_duration));
    println!("  Execution window:   {}", secs(settings.execution_window));
    println!("  Challenge window:   {}", secs(settings.challenge_window));
    println!("  Challenge cooldown: {}", secs(settings.challenge_cooldown));
    println!("  Challenge cost:     {}", settings.challenge_cost);
    println!("  Leave window:       {}", secs(settings.leave_window));
    println!("  Log level:          {}", config.logging.level);
    println!();
    println!(
        "  With {} members a proposal needs {} votes",
        settings.min_members,
        votes_required(settings.min_members, settings.quorum)
    );
    println!("  Changeable keys: {}", SETTING_KEYS.join(", "));
    println!();
    println!("✅ Configuration valid");
    Ok(())
}

/// Write a commented default config file
pub fn init(path: String, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(&path);
    if path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    TrustDaoConfig::create_default(path)?;
    println!("✅ Wrote default configuration to {}", path.display());
    Ok(())
}
