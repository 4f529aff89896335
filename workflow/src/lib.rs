mod error;
pub use error::{AggregatedErrors, Constraint, DefinitionError, ValidationError};

mod ident;
pub use ident::is_identifier;

mod value;
pub use value::{kind_name, Params};

mod param;
pub use param::{Constraints, ParamType, ParameterSpec, ParameterSpecBuilder, UnknownParamType};

mod stage;
pub use stage::{StageSpec, StageSpecBuilder, MAX_STAGE_NUMBER};

mod workflow;
pub use workflow::{WorkflowSpec, WorkflowSpecBuilder};

mod registry;
pub use registry::Registry;

pub mod catalogue;
