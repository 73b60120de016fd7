use {
    async_trait::async_trait,
    guildbot_modules::{CommandRegistry, Invocation, Module, handler_fn},
};

pub const NAME: &str = "echo";

/// Repeats its arguments back. Guilds may switch it off.
pub struct EchoModule;

#[async_trait]
impl Module for EchoModule {
    fn name(&self) -> &str {
        NAME
    }

    fn register_commands(&self, commands: &mut CommandRegistry) -> guildbot_modules::Result<()> {
        commands.command("echo", handler_fn(echo))?;
        Ok(())
    }
}

async fn echo(inv: Invocation) -> anyhow::Result<()> {
    if inv.args.is_empty() {
        inv.reply("Usage: echo <text>").await?;
    } else {
        inv.reply(&inv.args.join(" ")).await?;
    }
    Ok(())
}
