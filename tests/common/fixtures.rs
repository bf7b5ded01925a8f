use pagefig::idf::{ContentTree, FigureImage, IRNode, InlineNode, NodeMetadata};

/// A paragraph with exactly `chars` characters of text, linking to `refs`.
pub fn paragraph(id: &str, chars: usize, refs: &[&str]) -> IRNode {
    let label = "Fig.";
    let filler = chars.saturating_sub(label.len() * refs.len());
    let mut children = vec![InlineNode::text("x".repeat(filler))];
    for r in refs {
        children.push(InlineNode::link(format!("#{r}"), label));
    }
    IRNode::Paragraph {
        meta: NodeMetadata::with_id(id),
        children,
    }
}

pub fn heading(id: &str, text: &str) -> IRNode {
    IRNode::Heading {
        meta: NodeMetadata::with_id(id),
        level: 2,
        children: vec![InlineNode::text(text)],
    }
}

pub fn section(id: &str, children: Vec<IRNode>) -> IRNode {
    IRNode::Section {
        meta: NodeMetadata::with_id(id),
        children,
    }
}

/// A square figure without caption.
pub fn square_figure(id: &str) -> IRNode {
    IRNode::Figure {
        meta: NodeMetadata::with_id(id),
        image: FigureImage {
            src: format!("{id}.png"),
            natural_width: 800.0,
            natural_height: 800.0,
        },
        caption: Vec::new(),
        class: None,
    }
}

/// `p0` (four lines) references `f1` and `f2`; `p1` and `p2` are one line
/// each and reference nothing.
pub fn two_figure_article(document_id: &str) -> ContentTree {
    ContentTree::new(
        document_id,
        vec![
            paragraph("p0", 300, &["f1", "f2"]),
            square_figure("f1"),
            square_figure("f2"),
            paragraph("p1", 50, &[]),
            paragraph("p2", 50, &[]),
        ],
    )
}

/// Two sections; the second section's figure is referenced by its first block.
pub fn two_section_article() -> ContentTree {
    ContentTree::new(
        "sections",
        vec![
            section(
                "s1",
                vec![paragraph("p0", 100, &["f1"]), paragraph("p1", 100, &[])],
            ),
            section(
                "s2",
                vec![
                    paragraph("p2", 100, &["f2"]),
                    paragraph("p3", 100, &[]),
                    square_figure("f1"),
                    square_figure("f2"),
                ],
            ),
        ],
    )
}

/// A larger article with figures referenced out of numbering order, figures
/// referenced twice and one figure nothing links to.
pub fn long_article(document_id: &str, sections: usize) -> ContentTree {
    let mut children = Vec::new();
    let mut figure = 0;
    for s in 0..sections {
        let mut blocks = vec![heading(&format!("h{s}"), "Section heading")];
        let a = figure + 1;
        let b = figure + 2;
        let c = figure + 3;
        figure += 3;
        let (fa, fb, fc) = (format!("f{a}"), format!("f{b}"), format!("f{c}"));
        blocks.push(paragraph(&format!("s{s}p0"), 400, &[&fb, &fa]));
        blocks.push(paragraph(&format!("s{s}p1"), 900, &[&fa]));
        blocks.push(square_figure(&fa));
        blocks.push(paragraph(&format!("s{s}p2"), 250, &[]));
        blocks.push(square_figure(&fb));
        blocks.push(paragraph(&format!("s{s}p3"), 1200, &[]));
        blocks.push(square_figure(&fc));
        children.push(section(&format!("s{s}"), blocks));
    }
    ContentTree::new(document_id, children)
}
