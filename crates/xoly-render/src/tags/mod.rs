//! Built-in tags.
//!
//! Each is registered under its `cf`-prefixed name and also answers to the
//! bare spelling (`<if>` for `<cfif>`).

mod conditional;
mod control;
mod include;
mod loops;
mod output;
mod switch;
mod variables;

pub use conditional::{Else, ElseIf, If};
pub use control::{Abort, Break};
pub use include::Include;
pub use loops::Loop;
pub use output::{Dump, Output};
pub use switch::{Case, DefaultCase, Switch};
pub use variables::{Param, SaveContent, Set};

use crate::handler::Registry;

pub(crate) fn register_builtins(registry: &mut Registry) {
    registry.register("cfoutput", Output);
    registry.register("cfdump", Dump);
    registry.register("cfif", If);
    registry.register("cfelseif", ElseIf);
    registry.register("cfelse", Else);
    registry.register("cfloop", Loop);
    registry.register("cfswitch", Switch);
    registry.register("cfcase", Case);
    registry.register("cfdefault", DefaultCase);
    registry.register("cfparam", Param);
    registry.register("cfset", Set);
    registry.register("cfsavecontent", SaveContent);
    registry.register("cfinclude", Include);
    registry.register("cfbreak", Break);
    registry.register("cfabort", Abort);
}
