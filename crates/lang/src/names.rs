//! Well-known annotation and type names understood by the model.

// Binding markers
pub const INJECT: &str = "Inject";
pub const PROVIDES: &str = "Provides";
pub const BINDS: &str = "Binds";
pub const BINDS_INSTANCE: &str = "BindsInstance";
pub const ASSISTED_INJECT: &str = "AssistedInject";
pub const ASSISTED: &str = "Assisted";
pub const ASSISTED_FACTORY: &str = "AssistedFactory";

// Containers
pub const MODULE: &str = "Module";
pub const COMPONENT: &str = "Component";
pub const COMPONENT_BUILDER: &str = "Component.Builder";

// Meta-annotations
pub const QUALIFIER: &str = "Qualifier";
pub const SCOPE: &str = "Scope";
pub const NAMED: &str = "Named";
pub const REUSABLE: &str = "Reusable";

// Multi-bindings
pub const INTO_LIST: &str = "IntoList";
pub const INTO_SET: &str = "IntoSet";
pub const INTO_MAP: &str = "IntoMap";
pub const INTO_MAP_KEY: &str = "IntoMap.Key";
pub const MULTIBINDS: &str = "Multibinds";
pub const DECLARE_LIST: &str = "DeclareList";

// Conditions and variants
pub const CONDITIONAL: &str = "Conditional";
pub const CONDITION: &str = "Condition";
pub const ALL_CONDITIONS: &str = "AllConditions";
pub const ANY_CONDITION: &str = "AnyCondition";
pub const CONDITION_EXPRESSION: &str = "ConditionExpression";
pub const IMPORT_AS: &str = "ConditionExpression.ImportAs";
pub const COMPONENT_FLAVOR: &str = "ComponentFlavor";
pub const COMPONENT_VARIANT_DIMENSION: &str = "ComponentVariantDimension";

// Wrapper and collection types
pub const LAZY: &str = "Lazy";
pub const PROVIDER: &str = "Provider";
pub const OPTIONAL: &str = "Optional";
pub const LIST: &str = "List";
pub const SET: &str = "Set";
pub const MAP: &str = "Map";
pub const COLLECTION: &str = "Collection";

pub const BOOLEAN: &str = "boolean";
