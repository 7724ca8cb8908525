//! Declaration productions: specifiers, declarators, struct/union/enum
//! specifiers, parameter lists, type names and initializers.

use log::trace;

use crate::ast::*;
use crate::diagnostic::CompileError;

use super::{PResult, Parser};

/// Where a declaration-specifier list is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecifierContext {
    /// Specifiers heading a function definition. `struct`/`union` are not
    /// accepted here.
    FunctionDefinition,
    Declaration,
    Parameter,
}

const BASIC_TYPE_KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
];

/// Collapse a set of basic type keywords into one basic type.
fn combine_basic(words: &[&'static str], line: u32) -> Result<BasicType, CompileError> {
    let has = |w: &str| words.iter().any(|word| *word == w);
    if has("void") {
        if words.len() > 1 {
            return Err(CompileError::source(line, "void combined with other type specifiers"));
        }
        return Ok(BasicType::Void);
    }
    if has("float") || has("double") {
        return Ok(if has("float") { BasicType::Float } else { BasicType::Double });
    }
    Ok(if has("char") {
        BasicType::Char
    } else if has("short") {
        BasicType::Short
    } else if has("long") {
        BasicType::Long
    } else {
        BasicType::Int
    })
}

impl<'src> Parser<'src> {
    /// `function-definition | declaration`.
    pub(crate) fn parse_external_declaration(&mut self) -> PResult<ExternalDeclaration> {
        self.rule("external_declaration", |p| {
            if let Some(function) = p.parse_function_definition()? {
                return Ok(Some(ExternalDeclaration::Function(function)));
            }
            Ok(p.parse_declaration()?.map(ExternalDeclaration::Declaration))
        })
    }

    fn parse_function_definition(&mut self) -> PResult<FunctionDefinition> {
        self.rule("function_definition", |p| {
            let line = p.start_line();
            let Some(specifiers) = p.parse_declaration_specifiers(SpecifierContext::FunctionDefinition)? else {
                return Ok(None);
            };
            let Some(declarator) = p.parse_declarator()? else {
                return Ok(None);
            };
            let DeclaratorSuffix::Function(params) = &declarator.suffix else {
                return Ok(None);
            };

            // parameters hide typedef names of the same spelling inside the body
            p.enter_typedef_scope();
            for param in &params.params {
                if let ParamDeclarator::Named(named) = &param.declarator {
                    p.bind_declared_name(named.name, false);
                }
            }
            let body = p.parse_compound_statement()?;
            p.leave_typedef_scope();

            let Some(body) = body else {
                return Ok(None);
            };
            trace!("parsed function definition '{}'", declarator.name);
            Ok(Some(FunctionDefinition {
                specifiers,
                declarator,
                body,
                line,
            }))
        })
    }

    /// `declaration-specifiers init-declarator-list? ;`
    pub(crate) fn parse_declaration(&mut self) -> PResult<Declaration> {
        self.rule("declaration", |p| {
            let line = p.start_line();
            let Some(specifiers) = p.parse_declaration_specifiers(SpecifierContext::Declaration)? else {
                return Ok(None);
            };

            let mut declarators = Vec::new();
            if let Some(first) = p.parse_init_declarator()? {
                declarators.push(first);
                loop {
                    let saved = p.scanner.save();
                    if !p.scanner.eat(",") {
                        break;
                    }
                    match p.parse_init_declarator()? {
                        Some(next) => declarators.push(next),
                        None => {
                            p.scanner.restore(saved);
                            break;
                        }
                    }
                }
            }
            if !p.scanner.eat(";") {
                return Ok(None);
            }

            let is_typedef = specifiers.storage == Some(StorageClass::Typedef);
            for init in &declarators {
                p.bind_declared_name(init.declarator.name, is_typedef);
            }
            Ok(Some(Declaration {
                specifiers,
                declarators,
                line,
            }))
        })
    }

    fn parse_init_declarator(&mut self) -> PResult<InitDeclarator> {
        self.rule("init_declarator", |p| {
            let Some(declarator) = p.parse_declarator()? else {
                return Ok(None);
            };
            let saved = p.scanner.save();
            if !p.scanner.eat_punct("=", b"=") {
                return Ok(Some(InitDeclarator { declarator, init: None }));
            }
            match p.parse_initializer()? {
                Some(init) => Ok(Some(InitDeclarator {
                    declarator,
                    init: Some(init),
                })),
                None => {
                    p.scanner.restore(saved);
                    Ok(None)
                }
            }
        })
    }

    pub(crate) fn parse_declaration_specifiers(&mut self, context: SpecifierContext) -> PResult<DeclSpecifiers> {
        self.rule("declaration_specifiers", |p| {
            let line = p.start_line();
            let mut storage = None;
            let mut qualifiers = TypeQualifiers::empty();
            let mut basic: Vec<&'static str> = Vec::new();
            let mut special: Option<TypeSpecifier> = None;
            let mut matched = false;

            loop {
                if let Some(class) = p.storage_class() {
                    if context == SpecifierContext::Parameter && class != StorageClass::Register {
                        return Err(CompileError::source(line, "invalid storage class for a parameter"));
                    }
                    if storage.replace(class).is_some() {
                        return Err(CompileError::source(line, "more than one storage class"));
                    }
                    matched = true;
                    continue;
                }
                if let Some(qualifier) = p.type_qualifier() {
                    qualifiers |= qualifier;
                    matched = true;
                    continue;
                }
                if p.scanner.eat_keyword("inline") {
                    matched = true;
                    continue;
                }
                if let Some(word) = p.basic_type_keyword() {
                    if special.is_some() {
                        return Err(CompileError::source(line, "more than one type specifier"));
                    }
                    basic.push(word);
                    matched = true;
                    continue;
                }
                if special.is_none() && basic.is_empty() {
                    let allow_records = context != SpecifierContext::FunctionDefinition;
                    if let Some(spec) = p.parse_special_type_specifier(allow_records)? {
                        special = Some(spec);
                        matched = true;
                        continue;
                    }
                }
                break;
            }

            if !matched {
                return Ok(None);
            }
            let type_spec = match special {
                Some(spec) => spec,
                None if basic.is_empty() => TypeSpecifier::Basic(BasicType::Int),
                None => TypeSpecifier::Basic(combine_basic(&basic, line)?),
            };
            Ok(Some(DeclSpecifiers {
                storage,
                type_spec,
                qualifiers,
                line,
            }))
        })
    }

    /// Specifier-qualifier list used by member declarations and type names.
    /// At least one type specifier is required.
    fn parse_specifier_qualifiers(&mut self) -> PResult<(TypeSpecifier, TypeQualifiers)> {
        self.rule("specifier_qualifier_list", |p| {
            let line = p.start_line();
            let mut qualifiers = TypeQualifiers::empty();
            let mut basic: Vec<&'static str> = Vec::new();
            let mut special: Option<TypeSpecifier> = None;

            loop {
                if let Some(qualifier) = p.type_qualifier() {
                    qualifiers |= qualifier;
                    continue;
                }
                if let Some(word) = p.basic_type_keyword() {
                    if special.is_some() {
                        return Err(CompileError::source(line, "more than one type specifier"));
                    }
                    basic.push(word);
                    continue;
                }
                if special.is_none()
                    && basic.is_empty()
                    && let Some(spec) = p.parse_special_type_specifier(true)?
                {
                    special = Some(spec);
                    continue;
                }
                break;
            }

            let type_spec = match special {
                Some(spec) => spec,
                None if basic.is_empty() => return Ok(None),
                None => TypeSpecifier::Basic(combine_basic(&basic, line)?),
            };
            Ok(Some((type_spec, qualifiers)))
        })
    }

    fn storage_class(&mut self) -> Option<StorageClass> {
        [
            ("typedef", StorageClass::Typedef),
            ("extern", StorageClass::Extern),
            ("static", StorageClass::Static),
            ("auto", StorageClass::Auto),
            ("register", StorageClass::Register),
        ]
        .into_iter()
        .find(|(kw, _)| self.scanner.eat_keyword(kw))
        .map(|(_, class)| class)
    }

    fn type_qualifier(&mut self) -> Option<TypeQualifiers> {
        if self.scanner.eat_keyword("const") {
            Some(TypeQualifiers::CONST)
        } else if self.scanner.eat_keyword("volatile") {
            Some(TypeQualifiers::VOLATILE)
        } else if self.scanner.eat_keyword("restrict") {
            Some(TypeQualifiers::empty())
        } else {
            None
        }
    }

    fn basic_type_keyword(&mut self) -> Option<&'static str> {
        BASIC_TYPE_KEYWORDS
            .iter()
            .copied()
            .find(|kw| self.scanner.eat_keyword(kw))
    }

    /// struct/union/enum specifiers and typedef names.
    fn parse_special_type_specifier(&mut self, allow_records: bool) -> PResult<TypeSpecifier> {
        self.rule("type_specifier", |p| {
            if allow_records && let Some(record) = p.parse_record_specifier()? {
                return Ok(Some(TypeSpecifier::Record(record)));
            }
            if let Some(enumeration) = p.parse_enum_specifier()? {
                return Ok(Some(TypeSpecifier::Enum(enumeration)));
            }
            match p.identifier() {
                Some(name) if p.is_typedef_name(name) => Ok(Some(TypeSpecifier::TypedefName(name))),
                _ => Ok(None),
            }
        })
    }

    fn parse_record_specifier(&mut self) -> PResult<RecordSpecifier> {
        self.nested("struct_or_union_specifier", |p| {
            let line = p.start_line();
            let kind = if p.scanner.eat_keyword("struct") {
                RecordKind::Struct
            } else if p.scanner.eat_keyword("union") {
                RecordKind::Union
            } else {
                return Ok(None);
            };

            let name = p.identifier();
            if !p.scanner.eat("{") {
                if name.is_none() {
                    return Err(CompileError::source(line, "anonymous struct or union without a body"));
                }
                return Ok(Some(RecordSpecifier {
                    kind,
                    name,
                    members: None,
                    line,
                }));
            }

            let mut members = Vec::new();
            while let Some(member) = p.parse_member_declaration()? {
                members.push(member);
            }
            if !p.scanner.eat("}") {
                return Ok(None);
            }
            Ok(Some(RecordSpecifier {
                kind,
                name,
                members: Some(members),
                line,
            }))
        })
    }

    fn parse_member_declaration(&mut self) -> PResult<MemberDeclaration> {
        self.rule("struct_declaration", |p| {
            let line = p.start_line();
            let Some((type_spec, qualifiers)) = p.parse_specifier_qualifiers()? else {
                return Ok(None);
            };
            let mut declarators = Vec::new();
            loop {
                let Some(member) = p.parse_member_declarator()? else {
                    return Ok(None);
                };
                declarators.push(member);
                if !p.scanner.eat(",") {
                    break;
                }
            }
            if !p.scanner.eat(";") {
                return Ok(None);
            }
            Ok(Some(MemberDeclaration {
                type_spec,
                qualifiers,
                declarators,
                line,
            }))
        })
    }

    fn parse_member_declarator(&mut self) -> PResult<MemberDeclarator> {
        self.rule("struct_declarator", |p| {
            let declarator = p.parse_declarator()?;
            let bit_width = if p.scanner.eat(":") {
                let Some(width) = p.parse_constant_expression()? else {
                    return Ok(None);
                };
                Some(width)
            } else {
                None
            };
            if declarator.is_none() && bit_width.is_none() {
                return Ok(None);
            }
            Ok(Some(MemberDeclarator { declarator, bit_width }))
        })
    }

    fn parse_enum_specifier(&mut self) -> PResult<EnumSpecifier> {
        self.rule("enum_specifier", |p| {
            let line = p.start_line();
            if !p.scanner.eat_keyword("enum") {
                return Ok(None);
            }
            let name = p.identifier();
            if !p.scanner.eat("{") {
                if name.is_none() {
                    return Err(CompileError::source(line, "anonymous enum without a body"));
                }
                return Ok(Some(EnumSpecifier {
                    name,
                    enumerators: None,
                    line,
                }));
            }

            let mut enumerators = Vec::new();
            loop {
                if p.scanner.eat("}") {
                    break;
                }
                let enumerator_line = p.start_line();
                let Some(enumerator_name) = p.identifier() else {
                    return Ok(None);
                };
                let value = if p.scanner.eat_punct("=", b"=") {
                    let Some(value) = p.parse_constant_expression()? else {
                        return Ok(None);
                    };
                    Some(value)
                } else {
                    None
                };
                enumerators.push(Enumerator {
                    name: enumerator_name,
                    value,
                    line: enumerator_line,
                });
                if p.scanner.eat(",") {
                    continue;
                }
                if !p.scanner.eat("}") {
                    return Ok(None);
                }
                break;
            }
            if enumerators.is_empty() {
                return Err(CompileError::source(line, "enum without enumerators"));
            }
            Ok(Some(EnumSpecifier {
                name,
                enumerators: Some(enumerators),
                line,
            }))
        })
    }

    fn pointer_levels(&mut self) -> Vec<TypeQualifiers> {
        let mut pointers = Vec::new();
        while self.scanner.eat_punct("*", b"=") {
            let mut qualifiers = TypeQualifiers::empty();
            while let Some(qualifier) = self.type_qualifier() {
                qualifiers |= qualifier;
            }
            pointers.push(qualifiers);
        }
        pointers
    }

    /// `pointer? identifier suffix*` where suffixes are either all `[...]`
    /// or exactly one `(...)`.
    pub(crate) fn parse_declarator(&mut self) -> PResult<Declarator> {
        self.rule("declarator", |p| {
            let pointers = p.pointer_levels();
            let line = p.start_line();
            let Some(name) = p.identifier() else {
                return Ok(None);
            };

            let mut suffix = DeclaratorSuffix::None;
            loop {
                if p.scanner.eat("[") {
                    if matches!(suffix, DeclaratorSuffix::Function(_)) {
                        return Err(CompileError::source(line, "function declarator followed by []"));
                    }
                    let bound = p.parse_constant_expression()?;
                    if !p.scanner.eat("]") {
                        return Ok(None);
                    }
                    match &mut suffix {
                        DeclaratorSuffix::Array(dims) => dims.push(bound),
                        _ => suffix = DeclaratorSuffix::Array(vec![bound]),
                    }
                    continue;
                }

                let saved = p.scanner.save();
                if p.scanner.eat("(") {
                    match suffix {
                        DeclaratorSuffix::Array(_) => {
                            return Err(CompileError::source(line, "array declarator followed by ()"));
                        }
                        DeclaratorSuffix::Function(_) => {
                            return Err(CompileError::source(line, "function declarator followed by ()"));
                        }
                        DeclaratorSuffix::None => {}
                    }
                    p.scanner.restore(saved);
                    let Some(params) = p.parse_parameter_list()? else {
                        return Ok(None);
                    };
                    suffix = DeclaratorSuffix::Function(params);
                    continue;
                }
                break;
            }

            Ok(Some(Declarator {
                pointers,
                name,
                suffix,
                line,
            }))
        })
    }

    /// `( parameter-type-list )`, `( void )` or `( )`.
    fn parse_parameter_list(&mut self) -> PResult<ParameterList> {
        self.rule("parameter_type_list", |p| {
            let line = p.start_line();
            if !p.scanner.eat("(") {
                return Ok(None);
            }
            if p.scanner.eat(")") {
                return Ok(Some(ParameterList::default()));
            }
            let saved = p.scanner.save();
            if p.scanner.eat_keyword("void") && p.scanner.eat(")") {
                return Ok(Some(ParameterList::default()));
            }
            p.scanner.restore(saved);

            let mut list = ParameterList::default();
            loop {
                if !list.params.is_empty() && p.scanner.eat("...") {
                    list.variadic = true;
                    break;
                }
                match p.parse_parameter_declaration()? {
                    Some(param) => list.params.push(param),
                    None if list.params.is_empty() && p.identifier().is_some() => {
                        return Err(CompileError::source(
                            line,
                            "old-style parameter lists are not supported",
                        ));
                    }
                    None => return Ok(None),
                }
                if !p.scanner.eat(",") {
                    break;
                }
            }
            if !p.scanner.eat(")") {
                return Ok(None);
            }
            Ok(Some(list))
        })
    }

    fn parse_parameter_declaration(&mut self) -> PResult<ParameterDeclaration> {
        self.rule("parameter_declaration", |p| {
            let line = p.start_line();
            let Some(specifiers) = p.parse_declaration_specifiers(SpecifierContext::Parameter)? else {
                return Ok(None);
            };
            if let Some(declarator) = p.parse_declarator()? {
                if matches!(declarator.suffix, DeclaratorSuffix::Function(_)) {
                    return Err(CompileError::source(line, "function parameters are not supported"));
                }
                return Ok(Some(ParameterDeclaration {
                    specifiers,
                    declarator: ParamDeclarator::Named(declarator),
                    line,
                }));
            }
            let Some(abstract_declarator) = p.parse_abstract_declarator()? else {
                return Ok(None);
            };
            Ok(Some(ParameterDeclaration {
                specifiers,
                declarator: ParamDeclarator::Abstract(abstract_declarator),
                line,
            }))
        })
    }

    /// `pointer? ([ constant-expression? ])*`, possibly empty.
    fn parse_abstract_declarator(&mut self) -> PResult<AbstractDeclarator> {
        self.rule("abstract_declarator", |p| {
            let pointers = p.pointer_levels();
            let mut dims = Vec::new();
            loop {
                if !p.scanner.eat("[") {
                    break;
                }
                let bound = p.parse_constant_expression()?;
                if !p.scanner.eat("]") {
                    return Ok(None);
                }
                dims.push(bound);
            }
            Ok(Some(AbstractDeclarator { pointers, dims }))
        })
    }

    pub(crate) fn parse_type_name(&mut self) -> PResult<TypeName> {
        self.rule("type_name", |p| {
            let line = p.start_line();
            let Some((type_spec, qualifiers)) = p.parse_specifier_qualifiers()? else {
                return Ok(None);
            };
            let Some(declarator) = p.parse_abstract_declarator()? else {
                return Ok(None);
            };
            Ok(Some(TypeName {
                type_spec,
                qualifiers,
                declarator,
                line,
            }))
        })
    }

    pub(crate) fn parse_initializer(&mut self) -> PResult<Initializer> {
        self.nested("initializer", |p| {
            let line = p.start_line();
            if !p.scanner.eat("{") {
                return Ok(p.parse_assignment_expression()?.map(Initializer::Expr));
            }

            let mut items = Vec::new();
            loop {
                if p.scanner.eat("}") {
                    break;
                }
                let designators = p.parse_designation()?;
                let Some(init) = p.parse_initializer()? else {
                    return Ok(None);
                };
                items.push(InitializerItem { designators, init });
                if p.scanner.eat(",") {
                    continue;
                }
                if !p.scanner.eat("}") {
                    return Ok(None);
                }
                break;
            }
            Ok(Some(Initializer::List(items, line)))
        })
    }

    /// `designator+ =`, or nothing.
    fn parse_designation(&mut self) -> Result<Vec<Designator>, CompileError> {
        let saved = self.scanner.save();
        let mut designators = Vec::new();
        loop {
            if self.scanner.eat("[") {
                let Some(index) = self.parse_constant_expression()? else {
                    break;
                };
                if !self.scanner.eat("]") {
                    break;
                }
                designators.push(Designator::Index(index));
            } else if self.scanner.eat_punct(".", b".") {
                let Some(name) = self.identifier() else {
                    break;
                };
                designators.push(Designator::Member(name));
            } else {
                if !designators.is_empty() && self.scanner.eat_punct("=", b"=") {
                    return Ok(designators);
                }
                break;
            }
        }
        self.scanner.restore(saved);
        Ok(Vec::new())
    }
}
