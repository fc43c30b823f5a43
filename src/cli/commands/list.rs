use crate::cli::Output;
use crate::module::Registry;
use anyhow::Result;
use clap::Args;

#[derive(Args, Default)]
pub struct ListArgs {
    /// Also print the configuration fields of every module
    #[arg(long)]
    pub fields: bool,
}

pub fn execute(args: ListArgs, output: &Output) -> Result<()> {
    let registry = Registry::builtin();

    output.section_header("Checks");
    for name in registry.check_names() {
        output.list_item(name);
        if args.fields {
            print_fields(&registry.check_schema(name)?);
        }
    }

    output.section_header("Handlers");
    for name in registry.handler_names() {
        output.list_item(name);
        if args.fields {
            print_fields(&registry.handler_schema(name)?);
        }
    }
    Ok(())
}

fn print_fields(schema: &crate::schema::Schema) {
    for field in &schema.fields {
        let optional = if field.optional { " (optional)" } else { "" };
        println!("      {}: {}{}", field.name, field.kind.type_name(), optional);
    }
}
