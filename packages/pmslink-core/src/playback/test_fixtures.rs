//! Metadata documents shared by playback tests.

pub(crate) const MOVIE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="1" identifier="com.plexapp.plugins.library">
  <Video ratingKey="101" key="/library/metadata/101" type="movie" title="Heat"
         summary="A group of professional bank robbers." rating="8.3" studio="Warner Bros."
         contentRating="R" year="1995" tagline="A Los Angeles crime saga"
         thumb="/library/metadata/101/thumb/1" viewOffset="600000" duration="7200000">
    <Media id="11" duration="7200000" bitrate="10240" videoResolution="1080" container="mkv" videoCodec="h264">
      <Part id="201" key="/library/parts/201/file.mkv" file="/media/movies/Heat (1995).mkv">
        <Stream id="300" streamType="1" index="0" codec="h264"/>
        <Stream id="301" streamType="2" index="1" codec="ac3" languageCode="fra"/>
        <Stream id="302" streamType="2" index="2" codec="dts" languageCode="eng" selected="1"/>
        <Stream id="303" streamType="3" index="3" codec="srt" languageCode="fra"/>
        <Stream id="304" streamType="3" index="4" codec="srt" languageCode="eng" selected="1"/>
      </Part>
    </Media>
    <Media id="12" duration="7200000" bitrate="40000" videoResolution="4k" container="mkv" videoCodec="hevc" bitDepth="10">
      <Part id="202" key="/library/parts/202/file.mkv" file="/media/movies/Heat (1995) 4K.mkv"/>
    </Media>
    <Genre tag="Crime"/>
    <Genre tag="Thriller"/>
  </Video>
</MediaContainer>"#;

pub(crate) const EPISODE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="1" grandparentTitle="Breaking Bad" parentIndex="1">
  <Video ratingKey="120" key="/library/metadata/120" type="episode" title="...And the Bag's in the River"
         index="3" originallyAvailableAt="2008-02-10">
    <Media bitrate="4500" videoResolution="720" container="mp4" videoCodec="h264">
      <Part id="220" key="/library/parts/220/file.mp4" file="\\nas\tv\Breaking Bad\S01E03.mp4">
        <Stream id="320" streamType="2" index="1" codec="aac"/>
        <Stream id="900" streamType="3" key="/library/streams/900" codec="srt" selected="1"/>
      </Part>
    </Media>
    <Genre tag="Drama"/>
  </Video>
</MediaContainer>"#;

pub(crate) const TRACK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="1" parentTitle="OK Computer" grandparentTitle="Radiohead">
  <Track ratingKey="507" key="/library/metadata/507" parentKey="/library/metadata/500"
         title="Paranoid Android" index="7" parentIndex="1" duration="383000">
    <Media bitrate="1411" container="flac" audioCodec="flac">
      <Part id="607" key="/library/parts/607/file.flac" file="/music/Radiohead/OK Computer/07.flac"/>
    </Media>
  </Track>
</MediaContainer>"#;

pub(crate) const DVD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="1">
  <Video ratingKey="130" key="/library/metadata/130" type="movie" title="Alien">
    <Media bitrate="8000" videoResolution="sd" container="dvd">
      <Part id="230" key="/library/parts/230/file.ifo" file="/Volumes/Media/Alien/VIDEO_TS/VIDEO_TS.IFO"/>
    </Media>
  </Video>
</MediaContainer>"#;

pub(crate) const DVD_AND_FILE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="1">
  <Video ratingKey="131" key="/library/metadata/131" type="movie" title="Aliens">
    <Media bitrate="8000" videoResolution="sd" container="dvd">
      <Part id="231" key="/library/parts/231/file.ifo" file="/Volumes/Media/Aliens/VIDEO_TS/VIDEO_TS.IFO"/>
    </Media>
    <Media bitrate="6000" videoResolution="1080" container="mkv" videoCodec="h264">
      <Part id="232" key="/library/parts/232/file.mkv" file="/Volumes/Media/Aliens/Aliens (1986).mkv"/>
    </Media>
  </Video>
</MediaContainer>"#;

pub(crate) const STREAM_ONLY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="1">
  <Video ratingKey="140" key="/library/metadata/140" type="clip" title="Trailer" viewOffset="5000">
    <Media bitrate="2048" videoResolution="720" container="mp4" videoCodec="h264">
      <Part id="240" key="/library/parts/240/file.mp4"/>
    </Media>
    <Media bitrate="1000" videoResolution="480" container="avi" videoCodec="mpeg4">
      <Part id="241" key="/library/parts/241/file.avi"/>
    </Media>
  </Video>
</MediaContainer>"#;

pub(crate) const NO_PARTS_XML: &str = r#"<MediaContainer size="1">
  <Video ratingKey="150" key="/library/metadata/150" type="movie" title="Missing"/>
</MediaContainer>"#;
