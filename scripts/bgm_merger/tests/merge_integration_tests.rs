use std::fs;
use std::path::Path;

use anyhow::Result;
use bgm_merger::{
    MergerConfig, OggDurationProbe, extract_dialogues_from_file, merge_script_file,
};

/// 只包含 Vorbis 标识头和一页音频数据的最小 Ogg 文件
fn write_vorbis_file(path: &Path, seconds: u32) -> Result<()> {
    fn page(granule_position: i64, payload: &[u8]) -> Vec<u8> {
        let mut page = b"OggS".to_vec();
        page.extend_from_slice(&[0, 0]);
        page.extend_from_slice(&granule_position.to_le_bytes());
        page.extend_from_slice(&1u32.to_le_bytes());
        page.extend_from_slice(&[0; 8]);
        page.push(1);
        page.push(u8::try_from(payload.len()).unwrap());
        page.extend_from_slice(payload);
        page
    }

    let sample_rate = 44_100u32;
    let mut id = b"\x01vorbis".to_vec();
    id.extend_from_slice(&[0, 0, 0, 0, 2]);
    id.extend_from_slice(&sample_rate.to_le_bytes());
    id.extend_from_slice(&[0; 13]);

    let mut data = page(0, &id);
    data.extend(page(i64::from(sample_rate * seconds), b"audio"));
    fs::write(path, data)?;
    Ok(())
}

#[test]
fn test_merge_script_file_with_detected_channel() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let bgm_dir = dir.path().join("BGM");
    fs::create_dir(&bgm_dir)?;
    write_vorbis_file(&bgm_dir.join("msys01.ogg"), 120)?;
    write_vorbis_file(&bgm_dir.join("wa_01.ogg"), 2)?;

    let config_path = dir.path().join("merger.toml");
    fs::write(
        &config_path,
        format!(
            "bgm_folders = [{:?}, {:?}]\nmusic_threshold_seconds = 30.0\n",
            dir.path().join("missing").display().to_string(),
            bgm_dir.display().to_string()
        ),
    )?;
    let config = MergerConfig::load(&config_path)?;

    let script = "\u{feff}void main()\n\
                  {\n\
                  \tPlayBGM( 1, \"msys01\", 128, 0 );\n\
                  \tPlayBGM( 2, \"wa_01\", 128, 0 );\n\
                  \tOutputLine(NULL, \"hello\");\n\
                  <?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                  <PS3_SECTION>  <!-- ~~~~START~~~~ -->\n\
                  <ins type=\"BGM_PLAY\" bgm_file=\"ps3_theme\"></ins>\n\
                  <ins type=\"BGM_FADE\" duration=\"60\"></ins>\n\
                  </PS3_SECTION> <!-- ~~~~END~~~~ -->\n\
                  \tOutputLine(NULL, \"world\");\n\
                  }\n";
    let input_path = dir.path().join("merged.txt");
    fs::write(&input_path, script)?;

    let output_path = dir.path().join("out").join("final.txt");
    merge_script_file(&input_path, &output_path, &config, &OggDurationProbe)?;

    let merged = fs::read_to_string(&output_path)?;
    assert_eq!(
        merged,
        "void main()\n\
         {\n\
         \tPlayBGM( 2, \"wa_01\", 128, 0 );\n\
         \tOutputLine(NULL, \"hello\");\n\
         \tPlayBGM( 2, \"ps3_theme\", 128, 0 );\n\
         \tOutputLine(NULL, \"world\");\n\
         \tFadeOutBGM(0,1000,FALSE);\n\
         }\n"
    );

    Ok(())
}

#[test]
fn test_extract_dialogues_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let xml_path = dir.path().join("onik_001.xml");
    fs::write(
        &xml_path,
        "\u{feff}<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <PS3_SCRIPT>\n\
         <ins type=\"BGM_PLAY\" bgm_file=\"msys01\"></ins>\n\
         <ins type=\"DIALOGUE\" num=\"1\" dlgtype=\"2\" data=\"first\"></ins>\n\
         </PS3_SCRIPT>\n",
    )?;

    let dialogues = extract_dialogues_from_file(&xml_path)?;
    assert_eq!(dialogues.len(), 1);
    assert_eq!(dialogues[0].sequence_number, 1);
    assert_eq!(dialogues[0].dialogue_type, 2);
    assert_eq!(
        dialogues[0].preceding_raw_xml,
        vec!["<ins type=\"BGM_PLAY\" bgm_file=\"msys01\"></ins>".to_string()]
    );

    assert!(extract_dialogues_from_file(dir.path().join("missing.xml")).is_err());
    Ok(())
}
