//! Property check for incremental painting: applying a frame's diff on top
//! of the previous frame's screen must produce exactly the new frame.

use proptest::prelude::*;

use weft::testing::VirtualTerm;
use weft::*;

const W: u32 = 16;
const H: u32 = 5;

#[derive(Debug, Clone)]
struct Write {
    at: Point,
    text: String,
    style: Attrs,
}

fn arb_style() -> impl Strategy<Value = Attrs> {
    (any::<bool>(), any::<bool>(), proptest::option::of(0u8..=255)).prop_map(
        |(bold, reverse, fg)| {
            let mut a = Attrs::default();
            if bold {
                a = a.with_bold();
            }
            if reverse {
                a = a.with_reverse();
            }
            a.fg = fg.map(Color::Palette);
            a
        },
    )
}

fn arb_write() -> impl Strategy<Value = Write> {
    (0..W, 0..H, "[a-z 世é]{0,12}", arb_style()).prop_map(|(x, y, text, style)| Write {
        at: Point::new(x, y),
        text,
        style,
    })
}

fn paint(writes: &[Write]) -> ScreenBuffer {
    let mut buf = ScreenBuffer::new(Size::new(W, H), Attrs::default());
    for w in writes {
        buf.write_fragments(
            w.at,
            &FormattedText(vec![Fragment::new(w.style, w.text.clone())]),
            W,
            WrapMode::Wrap,
            Attrs::default(),
        );
    }
    buf
}

proptest! {
    #[test]
    fn diff_converges_on_the_new_frame(
        old in proptest::collection::vec(arb_write(), 0..6),
        new in proptest::collection::vec(arb_write(), 0..6),
    ) {
        let prev = paint(&old);
        let next = paint(&new);

        let mut screen = VirtualTerm::from_buffer(&prev);
        screen.apply(&next.diff(&prev));

        let expected = VirtualTerm::from_buffer(&next);
        prop_assert_eq!(screen.text(), expected.text());
    }

    #[test]
    fn identical_frames_diff_to_nothing(
        writes in proptest::collection::vec(arb_write(), 0..6),
    ) {
        let a = paint(&writes);
        let b = paint(&writes);
        prop_assert!(b.diff(&a).is_empty());
    }
}
