use regex_u16::{
    pattern::{Op, Pattern},
    unicode,
};

fn main() {
    // (.)(.)  -- two single-character capture groups
    let pattern = Pattern::builder()
        .code(vec![
            Op::StartCapture.word(1),
            Op::DotAny.word(0),
            Op::EndCapture.word(1),
            Op::StartCapture.word(2),
            Op::DotAny.word(0),
            Op::EndCapture.word(2),
            Op::End.word(0),
        ])
        .num_capture_groups(2)
        .build();

    let input = unicode::to_utf16("ab");
    let mut m = pattern.matcher(&input);
    assert!(m.matches().unwrap());
    println!(
        "group 1 = {:?}, group 2 = {:?}",
        unicode::from_utf16_lossy(m.group(1).unwrap()),
        unicode::from_utf16_lossy(m.group(2).unwrap()),
    );

    let swapped = m.replace_first(&unicode::to_utf16("$2$1")).unwrap();
    assert_eq!(swapped, unicode::to_utf16("ba"));
    println!("swapped = {:?}", unicode::from_utf16_lossy(&swapped));

    // Scan a longer subject with a literal program.
    let literal = unicode::to_utf16("an");
    let pattern = Pattern::builder()
        .code(vec![
            Op::String.word(0),
            Op::StringLen.word(literal.len() as u32),
            Op::End.word(0),
        ])
        .literal_text(literal)
        .build();
    let input = unicode::to_utf16("banana");
    let mut m = pattern.matcher(&input);
    while m.find().unwrap() {
        println!(
            "match at {}..{}",
            m.start(0).unwrap(),
            m.end(0).unwrap()
        );
    }
}
