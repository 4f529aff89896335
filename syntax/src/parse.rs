use anyhow::Result;

use crate::ast::WorkflowBlock;

#[derive(Debug, thiserror::Error)]
#[error("ParseError at offset {pos} on line '{line}': {msg}")]
pub struct Error {
    msg: String,
    pos: usize,
    line: String,
}

/// Parse the text of a catalogue file into a list of workflow blocks.
pub fn parse(text: &str) -> Result<Vec<WorkflowBlock<'_>>> {
    use combine::EasyParser;
    catalogue::workflows()
        .easy_parse(text)
        .map(|(blocks, _remainder)| blocks)
        .map_err(|e| {
            let e = e.map_position(|p| p.translate_position(text));
            let pos = e.position;
            // isolate the line in question:
            let before = &text[0..pos];
            let after = &text[pos..text.len()];
            let prefix: String = before.chars().rev().take_while(|&c| c != '\n').collect();
            let prefix: String = prefix.chars().rev().collect();
            let suffix: String = after.chars().take_while(|&c| c != '\n').collect();
            let line = prefix + &suffix;
            // since converting combine's errors is a lifetime nightmare,
            // we just stringify the error before returning it.
            Error {
                pos,
                line,
                msg: format!("{}", e),
            }
            .into()
        })
}

pub mod prelude {
    pub use combine::parser::char::{char, string};
    pub use combine::parser::range::recognize;
    pub use combine::*;
}

pub mod util {

    use super::prelude::*;
    use combine::parser::char::space;

    // identifiers are checked properly once the catalogue is loaded,
    // so here we accept anything that could plausibly be one.
    p! {
        ident_char() -> char, {
            satisfy(|c: char| c.is_alphanumeric() || c == '_' || c == '-')
        }
    }

    p! {
        ident() -> &'a str, {
            recognize(skip_many1(ident_char()))
        }
    }

    p! {
        comment() -> &'a str, {
            recognize(
                char('#')
                .and(skip_many(none_of("\n".chars())))
                .and(char('\n').map(|_| ()).or(eof()))
            )
        }
    }

    p! {
        whitespace() -> (), {
            skip_many1(
                space().map(|_| ()).or(comment().map(|_| ()))
            )
        }
    }

    wrapper! {
        lex(parser), {
            optional(whitespace()).with(parser).skip(optional(whitespace()))
        }
    }

    p! {
        line_internal_whitespace() -> (), {
            skip_many1(satisfy(|c: char| c.is_whitespace() && c != '\n'))
        }
    }

    wrapper! {
        lex_inline(parser), {
            optional(line_internal_whitespace())
                .with(parser)
                .skip(optional(line_internal_whitespace()))
        }
    }

    // a keyword must be followed by inline whitespace, so that e.g.
    // "stage_count" is never mistaken for the "stage" keyword.
    wrapper! {
        keyword(parser), {
            attempt(parser.skip(line_internal_whitespace()))
        }
    }

    wrapper! {
        braces(parser), {
            char('{').with(parser).skip(char('}'))
        }
    }

    wrapper! {
        brackets(parser), {
            char('[').with(parser).skip(char(']'))
        }
    }

    // a closing brace also ends a line, so short blocks fit on one: `stage 1 x { final }`.
    // a trailing comment ends one too.
    p! {
        eol() -> (), {
            choice!(
                eof(),
                char('\n').and(optional(whitespace())).map(|_| ()),
                comment().and(optional(whitespace())).map(|_| ()),
                look_ahead(char('}')).map(|_| ())
            )
        }
    }

    wrapper! {
        line(parser), {
            lex_inline(parser).skip(eol())
        }
    }

    repeater! {
        comma_delim(parser), {
            sep_by1(lex(parser), char(','))
        }
    }

}

mod literal {

    use super::prelude::*;
    use super::util::{brackets, lex, whitespace};
    use crate::ast::Literal;
    use combine::parser::char::digit;

    wrapper! {
        double_quotes(parser), {
            char('"').with(parser).skip(char('"'))
        }
    }

    p! {
        double_quoted() -> &'a str, {
            double_quotes(recognize(skip_many(none_of("\"".chars()))))
        }
    }

    p! {
        word() -> &'a str, {
            recognize(skip_many1(satisfy(|c: char|
                c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
            )))
        }
    }

    p! {
        integer() -> i64, {
            recognize((optional(char('-')), skip_many1(digit())))
                .and_then(|s: &'a str| s.parse::<i64>())
        }
    }

    p! {
        float() -> f64, {
            recognize((optional(char('-')), skip_many1(digit()), char('.'), skip_many1(digit())))
                .and_then(|s: &'a str| s.parse::<f64>())
        }
    }

    p! {
        unsigned() -> u32, {
            recognize(skip_many1(digit()))
                .and_then(|s: &'a str| s.parse::<u32>())
        }
    }

    p! {
        list() -> Vec<Literal<'a>>, {
            brackets(
                optional(whitespace()).with(sep_by(lex(value()), char(',')))
            )
        }
    }

    p! {
        value() -> Literal<'a>, {
            choice!(
                double_quoted().map(Literal::Str),
                list().map(Literal::List),
                attempt(float()).map(Literal::Float),
                attempt(integer()).map(Literal::Int),
                word().map(Literal::Word)
            )
        }
    }

}

mod param {

    use super::literal::{double_quoted, value};
    use super::prelude::*;
    use super::util::{brackets, comma_delim, ident, keyword, lex_inline};
    use crate::ast::{Literal, Param};

    p! {
        required_marker() -> bool, {
            optional(char('!')).map(|marker| marker.is_some())
        }
    }

    p! {
        constraint() -> (&'a str, Literal<'a>), {
            ident().skip(lex_inline(char('='))).and(value())
        }
    }

    p! {
        constraints() -> Vec<(&'a str, Literal<'a>)>, {
            brackets(comma_delim(constraint()))
        }
    }

    p! {
        param() -> Param<'a>, {
            keyword(string("param")).with((
                ident().skip(lex_inline(char(':'))),
                ident(),
                required_marker(),
                optional(attempt(lex_inline(char('=')).with(value()))),
                optional(attempt(lex_inline(constraints()))),
                optional(attempt(lex_inline(double_quoted()))),
            ))
            .map(|(name, ty, required, default, constraints, doc)| Param {
                name,
                ty,
                required,
                default,
                constraints: constraints.unwrap_or_default(),
                doc,
            })
        }
    }

}

mod block {

    use super::literal::{unsigned, value};
    use super::param::param;
    use super::prelude::*;
    use super::util::{braces, ident, keyword, lex, lex_inline, line, whitespace};
    use crate::ast::{Entry, Property, StageBlock, WorkflowBlock};

    p! {
        property() -> Property<'a>, {
            ident()
                .and(many(attempt(lex_inline(value()))))
                .map(|(key, values)| Property { key, values })
        }
    }

    p! {
        entry() -> Entry<'a>, {
            choice!(
                stage().map(Entry::Stage),
                param().map(Entry::Param),
                property().map(Entry::Property)
            )
        }
    }

    p! {
        body() -> Vec<Entry<'a>>, {
            braces(
                optional(whitespace()).with(many(line(entry())))
            )
        }
    }

    p! {
        stage() -> StageBlock<'a>, {
            keyword(string("stage")).with((
                lex_inline(unsigned()),
                lex(ident()),
                body(),
            ))
            .map(|(number, task_type, entries)| StageBlock {
                number,
                task_type,
                entries,
            })
        }
    }

    p! {
        workflow() -> WorkflowBlock<'a>, {
            keyword(string("workflow"))
                .with(lex(ident()))
                .and(body())
                .map(|(job_type, entries)| WorkflowBlock { job_type, entries })
        }
    }

    #[cfg(test)]
    mod test {
        use crate::ast::{Entry, Literal, Param, Property, StageBlock};
        use anyhow::Result;
        use combine::EasyParser;
        #[test]
        fn test_property() -> Result<()> {
            assert_eq!(
                Property::new("depends", vec![Literal::Int(1), Literal::Int(2)]),
                super::property().easy_parse("depends 1 2").unwrap().0
            );
            assert_eq!(
                Property::flag("final"),
                super::property().easy_parse("final").unwrap().0
            );
            // trailing whitespace after a flag is left for the line parser:
            assert_eq!(
                (Property::flag("final"), "  \n"),
                super::property().easy_parse("final  \n").unwrap()
            );
            Ok(())
        }
        #[test]
        fn test_stage() -> Result<()> {
            assert_eq!(
                StageBlock {
                    number: 2,
                    task_type: "reply",
                    entries: vec![
                        Entry::Property(Property::flag("final")),
                        Entry::Property(Property::new("depends", vec![Literal::Int(1)])),
                        Entry::Param(Param::simple("tone", "string")),
                    ],
                },
                super::stage()
                    .easy_parse("stage 2 reply {\n  final\n\n  # comment\n  depends 1\n  param tone: string\n}")
                    .unwrap()
                    .0
            );
            Ok(())
        }
        #[test]
        fn test_one_line_stage() -> Result<()> {
            let stage = super::stage().easy_parse("stage 3 x { final }").unwrap().0;
            assert_eq!(vec![Entry::Property(Property::flag("final"))], stage.entries);
            Ok(())
        }
        #[test]
        fn test_empty_stage() -> Result<()> {
            let stage = super::stage().easy_parse("stage 1 noop {}").unwrap().0;
            assert_eq!(1, stage.number);
            assert!(stage.entries.is_empty());
            Ok(())
        }
        #[test]
        fn test_entry_choice() -> Result<()> {
            // "stages" and "params" are ordinary properties:
            assert_eq!(
                Entry::Property(Property::new("stages", vec![Literal::Int(3)])),
                super::entry().easy_parse("stages 3").unwrap().0
            );
            assert_eq!(
                Entry::Property(Property::new("params", vec![])),
                super::entry().easy_parse("params").unwrap().0
            );
            Ok(())
        }
    }
}

mod catalogue {
    use super::block::workflow;
    use super::prelude::*;
    use super::util::{lex, whitespace};
    use crate::ast::WorkflowBlock;

    p! {
        workflows() -> Vec<WorkflowBlock<'a>>, {
            optional(whitespace())
                .with(many(lex(workflow())))
                .skip(eof())
        }
    }
}
